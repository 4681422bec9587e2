use crate::attrs::Attrs;
use crate::css::{clean, CssBuilder, Declarations};
use crate::element::Element;
use crate::fields::{FieldDef, Schema};
use crate::html::{escape, safe_url};
use crate::style_config::StyleRule;

use super::{icon, ALIGN_OPTIONS};

pub struct Button;

const STYLE: &[StyleRule] = &[
    StyleRule::new("button_bg_color", "background-color", " .jtb-button").hover(),
    StyleRule::new("button_text_color", "color", " .jtb-button").hover(),
    StyleRule::new("button_border_color", "border-color", " .jtb-button").hover(),
    StyleRule::new("button_border_width", "border-width", " .jtb-button").unit("px"),
    StyleRule::new("button_border_radius", "border-radius", " .jtb-button").unit("px"),
    StyleRule::new("button_font_size", "font-size", " .jtb-button").unit("px").responsive(),
];

impl Element for Button {
    fn slug(&self) -> &'static str {
        "button"
    }

    fn name(&self) -> &'static str {
        "Button"
    }

    fn icon(&self) -> &'static str {
        "mouse-pointer"
    }

    fn fields(&self) -> Schema {
        vec![
            ("text", FieldDef::text("Button Text", "Click Here")),
            ("link_url", FieldDef::url("Button Link", "#")),
            ("link_target", FieldDef::toggle("Open in New Tab", false)),
            (
                "button_style",
                FieldDef::select("Style", &[("filled", "Filled"), ("outline", "Outline")], "filled"),
            ),
            ("button_alignment", FieldDef::select("Alignment", ALIGN_OPTIONS, "left").responsive()),
            ("button_icon", FieldDef::icon("Icon", "").blank()),
            (
                "icon_placement",
                FieldDef::select("Icon Placement", &[("left", "Left"), ("right", "Right")], "right"),
            ),
            ("button_bg_color", FieldDef::color("Button Background", "#2ea3f2").hover()),
            ("button_text_color", FieldDef::color("Button Text Color", "#ffffff").hover()),
            ("button_border_color", FieldDef::color("Button Border Color", "").blank().hover()),
            ("button_border_width", FieldDef::range("Button Border Width", 0.0, 0.0, 20.0, "px")),
            ("button_border_radius", FieldDef::range("Button Border Radius", 3.0, 0.0, 100.0, "px")),
            ("button_font_size", FieldDef::range("Button Font Size", 16.0, 8.0, 60.0, "px").responsive()),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let text = escape(&attrs.text_or("text", "Click Here"));
        let href = escape(&safe_url(&attrs.text_or("link_url", "#")));
        let target = if attrs.bool("link_target") {
            " target=\"_blank\" rel=\"noopener noreferrer\""
        } else {
            ""
        };
        let style = match attrs.text("button_style").as_str() {
            "outline" => "outline",
            _ => "filled",
        };
        let glyph = attrs.str("button_icon").map(icon).unwrap_or_default();
        let label = format!("<span class=\"jtb-button-text\">{}</span>", text);
        let inner = if attrs.text("icon_placement") == "left" {
            format!("{}{}", glyph, label)
        } else {
            format!("{}{}", label, glyph)
        };

        format!(
            "<div class=\"jtb-button-wrapper\"><a class=\"jtb-button jtb-button-{}\" href=\"{}\"{}>{}</a></div>",
            style, href, target, inner
        )
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let wrapper = format!("{} .jtb-button-wrapper", selector);
        for device in crate::attrs::Device::ALL {
            if let Some(align) = attrs.responsive("button_alignment", device).and_then(|v| v.as_str()) {
                let mut decls = Declarations::new();
                decls.push("text-align", clean(align));
                css.rule(device, &wrapper, &decls);
            }
        }
        if attrs.text("button_style") == "outline" {
            let mut decls = Declarations::new();
            decls.push("background-color", "transparent");
            if let Some(color) = attrs.str("button_bg_color") {
                decls
                    .push("color", clean(color))
                    .push("border", format!("2px solid {}", clean(color)));
            }
            css.desktop(&format!("{} .jtb-button-outline", selector), &decls);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        Button.with_defaults(&Attrs::from_value(value).unwrap())
    }

    #[test]
    fn test_render_defaults() {
        let html = Button.render(&attrs(json!({})), "");
        assert_eq!(
            html,
            "<div class=\"jtb-button-wrapper\"><a class=\"jtb-button jtb-button-filled\" href=\"#\">\
             <span class=\"jtb-button-text\">Click Here</span></a></div>"
        );
    }

    #[test]
    fn test_render_new_tab_and_icon_left() {
        let html = Button.render(
            &attrs(json!({"link_url": "https://example.com", "link_target": "on", "button_icon": "arrow-right", "icon_placement": "left"})),
            "",
        );
        assert!(html.contains("target=\"_blank\" rel=\"noopener noreferrer\""));
        assert!(html.contains("<span class=\"jtb-icon jtb-icon-arrow-right\" aria-hidden=\"true\"></span><span class=\"jtb-button-text\">"));
    }

    #[test]
    fn test_render_rejects_script_urls() {
        let html = Button.render(&attrs(json!({"link_url": "javascript:alert(1)"})), "");
        assert!(html.contains("href=\"#\""));
    }

    #[test]
    fn test_css_button_colors_and_alignment() {
        let css = Button.generate_css(
            &attrs(json!({"button_bg_color__hover": "#111", "button_alignment": "center"})),
            "#btn",
        );
        assert!(css.starts_with(
            "#btn .jtb-button { background-color: #2ea3f2; color: #ffffff; border-width: 0px; border-radius: 3px; font-size: 16px; }\n"
        ));
        assert!(css.contains("#btn .jtb-button:hover { background-color: #111; }\n"));
        assert!(css.contains("#btn .jtb-button-wrapper { text-align: center; }\n"));
    }
}
