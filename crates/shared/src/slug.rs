//! URL slug generation.

/// Fallback used when a title contains nothing slug-worthy.
pub const FALLBACK_SLUG: &str = "item";

/// Turns a title into a lowercase ASCII slug.
///
/// Runs of anything that is not `[a-z0-9]` collapse into a single `-`,
/// and leading/trailing dashes are removed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Appends `-2`, `-3`, ... until `taken` reports the candidate free.
pub fn unique_slug(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Summer Holidays 2024"), "summer-holidays-2024");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Hello,   World!! "), "hello-world");
        assert_eq!(slugify("a--b__c"), "a-b-c");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Zürich"), "caf-z-rich");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
    }

    #[test]
    fn test_unique_slug() {
        let existing = ["trip", "trip-2"];
        let slug = unique_slug("trip", |s| existing.contains(&s));
        assert_eq!(slug, "trip-3");
        assert_eq!(unique_slug("new", |_| false), "new");
    }
}
