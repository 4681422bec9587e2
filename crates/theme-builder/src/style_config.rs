//! Declarative attribute-to-CSS mappings.
//!
//! A module lists `StyleRule`s instead of hand-writing CSS for simple
//! properties. Rules sharing a target selector and device are merged into a
//! single CSS rule, in declaration order.

use crate::attrs::{Attrs, Device};
use crate::css::{clean, length, CssBuilder, Declarations};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRule {
    pub attr: &'static str,
    pub property: &'static str,
    /// Appended to the module selector; `""` targets the module wrapper.
    pub selector: &'static str,
    pub unit: &'static str,
    pub hover: bool,
    pub responsive: bool,
}

impl StyleRule {
    pub const fn new(attr: &'static str, property: &'static str, selector: &'static str) -> Self {
        Self {
            attr,
            property,
            selector,
            unit: "",
            hover: false,
            responsive: false,
        }
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub const fn hover(mut self) -> Self {
        self.hover = true;
        self
    }

    pub const fn responsive(mut self) -> Self {
        self.responsive = true;
        self
    }

    fn render(&self, value: &serde_json::Value) -> Option<String> {
        if self.unit.is_empty() {
            match value {
                serde_json::Value::String(s) => Some(clean(s)).filter(|s| !s.is_empty()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        } else {
            length(value, self.unit)
        }
    }
}

struct Target {
    selector: String,
    device: Device,
    decls: Declarations,
}

fn target<'a>(targets: &'a mut Vec<Target>, selector: String, device: Device) -> &'a mut Declarations {
    let pos = match targets
        .iter()
        .position(|t| t.selector == selector && t.device == device)
    {
        Some(pos) => pos,
        None => {
            targets.push(Target {
                selector,
                device,
                decls: Declarations::new(),
            });
            targets.len() - 1
        }
    };
    &mut targets[pos].decls
}

pub fn apply(rules: &[StyleRule], attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut targets: Vec<Target> = Vec::new();

    for rule in rules {
        let full = format!("{}{}", selector, rule.selector);

        if let Some(value) = attrs.get(rule.attr).and_then(|v| rule.render(v)) {
            target(&mut targets, full.clone(), Device::Desktop).push(rule.property, value);
        }

        if rule.hover {
            let key = Attrs::hover_key(rule.attr);
            if let Some(value) = attrs.get(&key).and_then(|v| rule.render(v)) {
                target(&mut targets, format!("{}:hover", full), Device::Desktop)
                    .push(rule.property, value);
            }
        }

        if rule.responsive {
            for device in [Device::Tablet, Device::Phone] {
                if let Some(value) = attrs.responsive(rule.attr, device).and_then(|v| rule.render(v)) {
                    target(&mut targets, full.clone(), device).push(rule.property, value);
                }
            }
        }
    }

    for t in targets {
        css.rule(t.device, &t.selector, &t.decls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &[StyleRule] = &[
        StyleRule::new("button_bg_color", "background-color", " .jtb-button").hover(),
        StyleRule::new("button_text_color", "color", " .jtb-button").hover(),
        StyleRule::new("button_font_size", "font-size", " .jtb-button").unit("px").responsive(),
        StyleRule::new("title_color", "color", " .jtb-title"),
    ];

    #[test]
    fn test_rules_merge_per_selector() {
        let attrs = Attrs::from_value(json!({
            "button_bg_color": "#2ea3f2",
            "button_text_color": "#fff",
            "button_font_size": 15,
            "button_bg_color__hover": "#1a5f8c",
            "button_font_size__phone": "13",
            "title_color": "#222"
        }))
        .unwrap();
        let mut css = CssBuilder::new();
        apply(RULES, &attrs, "#b", &mut css);
        assert_eq!(
            css.finish(),
            "#b .jtb-button { background-color: #2ea3f2; color: #fff; font-size: 15px; }\n\
             #b .jtb-button:hover { background-color: #1a5f8c; }\n\
             #b .jtb-title { color: #222; }\n\
             @media (max-width: 767px) {\n  #b .jtb-button { font-size: 13px; }\n}\n"
        );
    }

    #[test]
    fn test_missing_attrs_emit_nothing() {
        let mut css = CssBuilder::new();
        apply(RULES, &Attrs::new(), "#b", &mut css);
        assert!(css.is_empty());
    }
}
