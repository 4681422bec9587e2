//! Site-wide theme settings rendered as `:root` custom properties.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::css::clean;
use crate::error::RenderError;

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Color,
    /// Plain number rendered with `px`.
    Px,
    /// Free text such as a font family or `-0.02em`.
    Text,
}

struct Variable {
    key: &'static str,
    default: &'static str,
    var: &'static str,
    kind: Kind,
}

const fn v(key: &'static str, default: &'static str, var: &'static str, kind: Kind) -> Variable {
    Variable { key, default, var, kind }
}

const VARIABLES: &[Variable] = &[
    v("primary_color", "#6366f1", "primary-color", Kind::Color),
    v("secondary_color", "#8b5cf6", "secondary-color", Kind::Color),
    v("accent_color", "#f59e0b", "accent-color", Kind::Color),
    v("text_color", "#374151", "text-color", Kind::Color),
    v("text_light_color", "#6b7280", "text-light-color", Kind::Color),
    v("heading_color", "#111827", "heading-color", Kind::Color),
    v("link_color", "#6366f1", "link-color", Kind::Color),
    v("link_hover_color", "#4f46e5", "link-hover-color", Kind::Color),
    v("background_color", "#ffffff", "background-color", Kind::Color),
    v("surface_color", "#f9fafb", "surface-color", Kind::Color),
    v("border_color", "#e5e7eb", "border-color", Kind::Color),
    v("success_color", "#10b981", "success-color", Kind::Color),
    v("warning_color", "#f59e0b", "warning-color", Kind::Color),
    v("error_color", "#ef4444", "error-color", Kind::Color),
    v("info_color", "#3b82f6", "info-color", Kind::Color),
    v("body_font", "Inter", "body-font", Kind::Text),
    v("body_size", "16", "body-size", Kind::Px),
    v("body_weight", "400", "body-weight", Kind::Text),
    v("body_line_height", "1.7", "body-line-height", Kind::Text),
    v("heading_font", "Inter", "heading-font", Kind::Text),
    v("heading_weight", "700", "heading-weight", Kind::Text),
    v("heading_line_height", "1.3", "heading-line-height", Kind::Text),
    v("heading_letter_spacing", "-0.02em", "heading-letter-spacing", Kind::Text),
    v("h1_size", "48", "h1-size", Kind::Px),
    v("h2_size", "36", "h2-size", Kind::Px),
    v("h3_size", "28", "h3-size", Kind::Px),
    v("h4_size", "24", "h4-size", Kind::Px),
    v("h5_size", "20", "h5-size", Kind::Px),
    v("h6_size", "18", "h6-size", Kind::Px),
    v("content_width", "1200", "content-width", Kind::Px),
    v("gutter_width", "30", "gutter-width", Kind::Px),
    v("section_padding_top", "80", "section-padding-top", Kind::Px),
    v("section_padding_bottom", "80", "section-padding-bottom", Kind::Px),
    v("row_gap", "30", "row-gap", Kind::Px),
    v("column_gap", "30", "column-gap", Kind::Px),
    v("button_bg_color", "#6366f1", "button-bg", Kind::Color),
    v("button_text_color", "#ffffff", "button-text", Kind::Color),
    v("button_border_color", "#6366f1", "button-border-color", Kind::Color),
    v("button_border_width", "0", "button-border-width", Kind::Px),
    v("button_border_radius", "8", "button-border-radius", Kind::Px),
    v("button_padding_tb", "12", "button-padding-tb", Kind::Px),
    v("button_padding_lr", "24", "button-padding-lr", Kind::Px),
    v("button_font_size", "16", "button-font-size", Kind::Px),
    v("button_font_weight", "600", "button-font-weight", Kind::Text),
    v("button_hover_bg", "#4f46e5", "button-hover-bg", Kind::Color),
    v("button_hover_text", "#ffffff", "button-hover-text", Kind::Color),
    v("input_bg_color", "#ffffff", "input-bg", Kind::Color),
    v("input_text_color", "#374151", "input-text", Kind::Color),
    v("input_border_color", "#d1d5db", "input-border", Kind::Color),
    v("input_border_radius", "6", "input-border-radius", Kind::Px),
    v("input_focus_border_color", "#6366f1", "input-focus-border", Kind::Color),
    v("label_color", "#374151", "label-color", Kind::Color),
];

const FONT_STACK: &str = "ui-sans-serif, system-ui, -apple-system, sans-serif";

fn lookup(key: &str) -> Option<&'static Variable> {
    VARIABLES.iter().find(|var| var.key == key)
}

fn valid(kind: Kind, value: &str) -> bool {
    match kind {
        Kind::Color => HEX_COLOR.is_match(value),
        Kind::Px => value.parse::<f64>().map(|n| n >= 0.0).unwrap_or(false),
        Kind::Text => !value.is_empty() && clean(value) == value,
    }
}

/// Scales each RGB channel by `percent` (negative darkens).
pub fn adjust_brightness(hex: &str, percent: i32) -> String {
    let digits = hex.trim_start_matches('#');
    let full: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    if full.len() != 6 {
        return format!("#{}", full);
    }
    let Ok(rgb) = u32::from_str_radix(&full, 16) else {
        return format!("#{}", full);
    };
    let channel = |shift: u32| {
        let c = f64::from((rgb >> shift) & 0xff);
        (c + c * f64::from(percent) / 100.0).clamp(0.0, 255.0) as u32
    };
    format!("#{:02x}{:02x}{:02x}", channel(16), channel(8), channel(0))
}

/// Overrides on top of the built-in defaults. Only known keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeSettings(BTreeMap<String, String>);

impl ThemeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from stored key/value pairs; unknown or invalid pairs are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::new();
        for (key, value) in pairs {
            if let Err(err) = settings.set(key.as_ref(), value.as_ref()) {
                tracing::debug!(error = %err, "ignoring stored theme setting");
            }
        }
        settings
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        VARIABLES.iter().map(|var| var.key)
    }

    pub fn default_for(key: &str) -> Option<&'static str> {
        lookup(key).map(|var| var.default)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), RenderError> {
        let var = lookup(key).ok_or_else(|| RenderError::UnknownSetting(key.to_string()))?;
        let value = value.trim();
        if !valid(var.kind, value) {
            return Err(RenderError::InvalidSetting { key: key.to_string() });
        }
        if value == var.default {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Effective value, falling back to the default. Unknown keys give `""`.
    pub fn get(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(value) => value,
            None => Self::default_for(key).unwrap_or(""),
        }
    }

    /// Every key with its effective value, in declaration order.
    pub fn effective(&self) -> Vec<(&'static str, String)> {
        VARIABLES
            .iter()
            .map(|var| (var.key, self.get(var.key).to_string()))
            .collect()
    }

    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for var in VARIABLES {
            let value = self.get(var.key);
            let rendered = match var.kind {
                Kind::Px => format!("{}px", value),
                Kind::Text if var.key.ends_with("_font") => format!("\"{}\", {}", value, FONT_STACK),
                _ => value.to_string(),
            };
            css.push_str(&format!("  --jtb-{}: {};\n", var.var, rendered));
            if var.key == "primary_color" {
                css.push_str(&format!("  --jtb-primary-hover: {};\n", adjust_brightness(value, -10)));
                css.push_str(&format!("  --jtb-primary-light: {};\n", adjust_brightness(value, 40)));
            }
        }
        css.push_str("}\n");
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_render() {
        let css = ThemeSettings::new().to_css();
        assert!(css.starts_with(":root {\n  --jtb-primary-color: #6366f1;\n  --jtb-primary-hover: #595bd8;\n"));
        assert!(css.contains("  --jtb-body-font: \"Inter\", ui-sans-serif, system-ui, -apple-system, sans-serif;\n"));
        assert!(css.contains("  --jtb-h1-size: 48px;\n"));
        assert!(css.contains("  --jtb-heading-letter-spacing: -0.02em;\n"));
        assert!(css.ends_with("}\n"));
    }

    #[test]
    fn test_override() {
        let mut settings = ThemeSettings::new();
        settings.set("primary_color", "#000").unwrap();
        settings.set("content_width", "960").unwrap();
        let css = settings.to_css();
        assert!(css.contains("--jtb-primary-color: #000;"));
        assert!(css.contains("--jtb-primary-light: #000000;"));
        assert!(css.contains("--jtb-content-width: 960px;"));
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        let mut settings = ThemeSettings::new();
        assert!(matches!(settings.set("logo", "x"), Err(RenderError::UnknownSetting(_))));
        assert!(matches!(settings.set("text_color", "red;}"), Err(RenderError::InvalidSetting { .. })));
        assert!(settings.set("body_size", "-4").is_err());
        assert!(settings.set("body_font", "Inter\"; }").is_err());
    }

    #[test]
    fn test_default_value_not_stored() {
        let mut settings = ThemeSettings::new();
        settings.set("h1_size", "48").unwrap();
        assert_eq!(settings, ThemeSettings::new());
    }

    #[test]
    fn test_from_pairs_skips_bad_values() {
        let settings = ThemeSettings::from_pairs([("accent_color", "#123456"), ("nope", "1"), ("h2_size", "big")]);
        assert_eq!(settings.get("accent_color"), "#123456");
        assert_eq!(settings.get("h2_size"), "36");
        assert_eq!(settings.get("nope"), "");
    }

    #[test]
    fn test_adjust_brightness() {
        assert_eq!(adjust_brightness("#6366f1", -10), "#595bd8");
        assert_eq!(adjust_brightness("#fff", 40), "#ffffff");
        assert_eq!(adjust_brightness("#12", 10), "#12");
    }
}
