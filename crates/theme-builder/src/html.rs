//! HTML escaping helpers shared by the modules.

/// Escapes text for use in element content or a quoted attribute.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// ` name="value"` with the value escaped, or nothing when `value` is empty.
pub fn attr(name: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(" {}=\"{}\"", name, escape(value))
    }
}

/// Keeps only characters valid in a class or id token list.
pub fn class_list(input: &str) -> String {
    input
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accepts `http(s)://`, root-relative, anchor and `mailto:` targets; anything
/// else (notably `javascript:`) becomes `#`.
pub fn safe_url(url: &str) -> String {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with('/')
        || lower.starts_with('#')
        || lower.starts_with('?');
    if allowed {
        trimmed.to_string()
    } else {
        "#".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_attr_skips_empty() {
        assert_eq!(attr("placeholder", ""), "");
        assert_eq!(attr("placeholder", "a\"b"), " placeholder=\"a&quot;b\"");
    }

    #[test]
    fn test_class_list_strips_injection() {
        assert_eq!(class_list("hero  big\" onclick=x"), "hero big onclickx");
    }

    #[test]
    fn test_safe_url() {
        assert_eq!(safe_url("/search"), "/search");
        assert_eq!(safe_url("https://example.com"), "https://example.com");
        assert_eq!(safe_url("JavaScript:alert(1)"), "#");
    }
}
