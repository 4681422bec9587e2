//! Module attribute maps.
//!
//! Attributes arrive as a flat JSON object. Responsive variants live under
//! `key__tablet` / `key__phone`, hover variants under `key__hover`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::fields::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Desktop,
    Tablet,
    Phone,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Desktop, Device::Tablet, Device::Phone];

    pub fn suffix(self) -> &'static str {
        match self {
            Device::Desktop => "",
            Device::Tablet => "__tablet",
            Device::Phone => "__phone",
        }
    }

    /// Media query wrapping rules for this device; desktop rules are unwrapped.
    pub fn media_query(self) -> Option<&'static str> {
        match self {
            Device::Desktop => None,
            Device::Tablet => Some("@media (max-width: 980px)"),
            Device::Phone => Some("@media (max-width: 767px)"),
        }
    }
}

pub const HOVER_SUFFIX: &str = "__hover";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(Map<String, Value>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an object; `null` gives an empty map.
    pub fn from_value(value: Value) -> Result<Self, RenderError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            _ => Err(RenderError::AttrsNotObject),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string value; numbers are not coerced.
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Scalar value rendered as text; missing, null and composite values give `""`.
    pub fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        let value = self.text(key);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }

    /// Toggle semantics: `true`, `"yes"`, `"on"`, `"true"`, `"1"` and `1` are on.
    pub fn bool(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => matches!(s.trim(), "yes" | "on" | "true" | "1"),
            _ => false,
        }
    }

    /// Numeric value; numeric strings parse, a trailing unit is ignored.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => {
                let digits: String = s
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | '+'))
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    /// Whether the key holds something other than null or an empty string.
    pub fn has(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Value for `key` on `device`. Tablet and phone never inherit the desktop
    /// value here; the media query cascade takes care of that.
    pub fn responsive(&self, key: &str, device: Device) -> Option<&Value> {
        let value = self.0.get(&device_key(key, device))?;
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            other => Some(other),
        }
    }

    pub fn hover_key(key: &str) -> String {
        format!("{}{}", key, HOVER_SUFFIX)
    }

    /// Fills every absent key with the schema default. Blank defaults are skipped.
    pub fn merge_defaults(&mut self, schema: &Schema) {
        for (name, def) in schema {
            if def.default.is_null() {
                continue;
            }
            self.0
                .entry((*name).to_string())
                .or_insert_with(|| def.default.clone());
        }
    }

    /// Array value, or an empty slice.
    pub fn list(&self, key: &str) -> &[Value] {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub fn device_key(key: &str, device: Device) -> String {
    format!("{}{}", key, device.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDef;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        Attrs::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Attrs::from_value(json!([1, 2])).is_err());
        assert!(Attrs::from_value(json!("x")).is_err());
        assert_eq!(Attrs::from_value(Value::Null).unwrap(), Attrs::new());
    }

    #[test]
    fn test_bool_accepts_toggle_spellings() {
        let a = attrs(json!({
            "a": true, "b": "yes", "c": "on", "d": 1, "e": "1",
            "f": false, "g": "no", "h": 0, "i": "off"
        }));
        for key in ["a", "b", "c", "d", "e"] {
            assert!(a.bool(key), "{} should be on", key);
        }
        for key in ["f", "g", "h", "i", "missing"] {
            assert!(!a.bool(key), "{} should be off", key);
        }
    }

    #[test]
    fn test_number_parses_strings_with_units() {
        let a = attrs(json!({"n": 12, "s": "18px", "bad": "abc", "f": "1.5"}));
        assert_eq!(a.number("n"), Some(12.0));
        assert_eq!(a.number("s"), Some(18.0));
        assert_eq!(a.number("f"), Some(1.5));
        assert_eq!(a.number("bad"), None);
        assert_eq!(a.number_or("missing", 3.0), 3.0);
    }

    #[test]
    fn test_text_and_str() {
        let a = attrs(json!({"s": "hi", "empty": "", "n": 4}));
        assert_eq!(a.str("s"), Some("hi"));
        assert_eq!(a.str("empty"), None);
        assert_eq!(a.str("n"), None);
        assert_eq!(a.text("n"), "4");
        assert_eq!(a.text_or("empty", "fallback"), "fallback");
    }

    #[test]
    fn test_responsive_keys() {
        let a = attrs(json!({"font_size": 20, "font_size__tablet": 16, "font_size__phone": ""}));
        assert_eq!(a.responsive("font_size", Device::Desktop), Some(&json!(20)));
        assert_eq!(a.responsive("font_size", Device::Tablet), Some(&json!(16)));
        assert_eq!(a.responsive("font_size", Device::Phone), None);
        assert_eq!(Attrs::hover_key("text_color"), "text_color__hover");
    }

    #[test]
    fn test_merge_defaults_keeps_explicit_values() {
        let schema: Schema = vec![
            ("title", FieldDef::text("Title", "Login")),
            ("button_text", FieldDef::text("Button", "Sign in")),
            ("css_id", FieldDef::text("ID", "").blank()),
        ];
        let mut a = attrs(json!({"title": "Members"}));
        a.merge_defaults(&schema);
        assert_eq!(a.text("title"), "Members");
        assert_eq!(a.text("button_text"), "Sign in");
        assert!(a.get("css_id").is_none());
    }
}
