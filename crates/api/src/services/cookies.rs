//! Session cookie helper.
//!
//! Builds, reads and clears the HttpOnly cookie carrying the raw session token.
//! Only the SHA-256 of the token is stored server-side.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::SessionConfig;

#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: SessionConfig,
}

impl CookieHelper {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Set-Cookie value for a session token living `max_age` seconds.
    pub fn build_session_cookie(&self, token: &str, max_age: i64) -> String {
        self.with_attributes(format!(
            "{}={}; Path=/; Max-Age={}",
            self.config.cookie_name, token, max_age
        ))
    }

    /// Set-Cookie value removing the session cookie.
    pub fn build_clear_cookie(&self) -> String {
        self.with_attributes(format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.config.cookie_name
        ))
    }

    pub fn add_session_cookie(&self, headers: &mut HeaderMap, token: &str, max_age: i64) {
        if let Ok(value) = HeaderValue::from_str(&self.build_session_cookie(token, max_age)) {
            headers.append(SET_COOKIE, value);
        }
    }

    pub fn add_clear_cookie(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_clear_cookie()) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Extract a cookie value from request headers by name.
    pub fn extract_cookie<'a>(&self, headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|cookie_header| cookie_header.split(';'))
            .map(str::trim)
            .find_map(|cookie| {
                let (cookie_name, cookie_value) = cookie.split_once('=')?;
                (cookie_name == name).then_some(cookie_value)
            })
    }

    /// The raw session token, if the request carries a non-empty one.
    pub fn extract_session_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.extract_cookie(headers, &self.config.cookie_name)
            .filter(|token| !token.is_empty())
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly");

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.same_site));

        if !self.config.domain.is_empty() {
            cookie.push_str(&format!("; Domain={}", self.config.domain));
        }

        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        SessionConfig {
            cookie_name: "jessie_session".to_string(),
            secure: true,
            same_site: "Strict".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_session_cookie() {
        let helper = CookieHelper::new(test_config());
        let cookie = helper.build_session_cookie("abc123", 7200);

        assert!(cookie.starts_with("jessie_session=abc123; Path=/; Max-Age=7200"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Domain="));
    }

    #[test]
    fn test_build_clear_cookie() {
        let helper = CookieHelper::new(test_config());
        let cookie = helper.build_clear_cookie();

        assert!(cookie.contains("jessie_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn test_insecure_cookie_with_domain() {
        let helper = CookieHelper::new(SessionConfig {
            secure: false,
            domain: "cms.example.com".into(),
            ..test_config()
        });
        let cookie = helper.build_session_cookie("t", 60);
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("Domain=cms.example.com"));
    }

    #[test]
    fn test_extract_session_token() {
        let helper = CookieHelper::new(test_config());
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; jessie_session=tok; other=1"),
        );
        assert_eq!(helper.extract_session_token(&headers), Some("tok"));
        assert_eq!(helper.extract_cookie(&headers, "theme"), Some("dark"));
        assert_eq!(helper.extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_empty_session_token_is_ignored() {
        let helper = CookieHelper::new(test_config());
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, HeaderValue::from_static("jessie_session="));
        assert_eq!(helper.extract_session_token(&headers), None);
    }

    #[test]
    fn test_add_cookies_to_headers() {
        let helper = CookieHelper::new(test_config());
        let mut headers = HeaderMap::new();
        helper.add_session_cookie(&mut headers, "tok", 10);
        helper.add_clear_cookie(&mut headers);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }
}
