//! Common validation utilities.
//!
//! Field-level validators return `validator::ValidationError` so they can be
//! plugged into `#[validate(custom(function = ...))]`.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").unwrap();
    static ref HEX_COLOR_RE: Regex =
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap();
    static ref IP_PATTERN_RE: Regex = Regex::new(r"^[0-9a-fA-F:.]{1,45}$").unwrap();
}

/// Image extensions accepted by gallery uploads unless configured otherwise.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Slugs: lowercase alphanumerics separated by single dashes, at most 255 chars.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.len() <= 255 && SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(error(
            "slug_format",
            "Slug may only contain lowercase letters, digits and single dashes",
        ))
    }
}

/// Usernames: 3-50 characters from `[A-Za-z0-9_.-]`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(error(
            "username_format",
            "Username must be 3-50 characters of letters, digits, '_', '.' or '-'",
        ))
    }
}

/// `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_RE.is_match(color) {
        Ok(())
    } else {
        Err(error("color_format", "Color must be a hex value like #1a2b3c"))
    }
}

/// Loose IP filter check (full or partial IPv4/IPv6 text).
pub fn validate_ip_pattern(ip: &str) -> Result<(), ValidationError> {
    if IP_PATTERN_RE.is_match(ip) {
        Ok(())
    } else {
        Err(error("ip_format", "IP filter may only contain hex digits, '.' and ':'"))
    }
}

/// Lowercased extension of a file name, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether `filename` carries one of the whitelisted extensions.
pub fn extension_allowed<S: AsRef<str>>(filename: &str, whitelist: &[S]) -> bool {
    match file_extension(filename) {
        Some(ext) => whitelist.iter().any(|allowed| allowed.as_ref() == ext),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("summer-2024").is_ok());
        assert!(validate_slug("a").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug("with space").is_err());
    }

    #[test]
    fn test_validate_slug_error_message() {
        let err = validate_slug("Bad Slug").unwrap_err();
        assert_eq!(err.code, "slug_format");
        assert!(err.message.is_some());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("jane.doe-01_x").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("emoji🙂").is_err());
    }

    #[test]
    fn test_validate_hex_color() {
        assert!(validate_hex_color("#fff").is_ok());
        assert!(validate_hex_color("#1A2b3C").is_ok());
        assert!(validate_hex_color("#11223344").is_ok());
        assert!(validate_hex_color("fff").is_err());
        assert!(validate_hex_color("#ggg").is_err());
        assert!(validate_hex_color("#12345").is_err());
    }

    #[test]
    fn test_validate_ip_pattern() {
        assert!(validate_ip_pattern("192.168.").is_ok());
        assert!(validate_ip_pattern("2001:db8::1").is_ok());
        assert!(validate_ip_pattern("1.1.1.1; DROP").is_err());
        assert!(validate_ip_pattern("").is_err());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_extension_whitelist_enforced() {
        assert!(extension_allowed("cat.png", DEFAULT_IMAGE_EXTENSIONS));
        assert!(extension_allowed("CAT.WEBP", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!extension_allowed("shell.php", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!extension_allowed("image.png.exe", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!extension_allowed("png", DEFAULT_IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_extension_whitelist_from_config_strings() {
        let configured = vec!["png".to_string()];
        assert!(extension_allowed("a.png", &configured));
        assert!(!extension_allowed("a.jpg", &configured));
    }
}
