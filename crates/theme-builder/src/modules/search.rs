use crate::attrs::Attrs;
use crate::css::{clean, hex_to_rgba, CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{escape, safe_url};

use super::ALIGN_OPTIONS;

pub struct Search;

const SEARCH_ICON: &str = "<svg class=\"jtb-search-icon\" width=\"18\" height=\"18\" viewBox=\"0 0 24 24\" fill=\"none\" \
stroke=\"currentColor\" stroke-width=\"2\" aria-hidden=\"true\"><circle cx=\"11\" cy=\"11\" r=\"8\"/><path d=\"m21 21-4.35-4.35\"/></svg>";

impl Element for Search {
    fn slug(&self) -> &'static str {
        "search"
    }

    fn name(&self) -> &'static str {
        "Search"
    }

    fn icon(&self) -> &'static str {
        "search"
    }

    fn category(&self) -> Category {
        Category::Forms
    }

    fn fields(&self) -> Schema {
        vec![
            ("placeholder", FieldDef::text("Placeholder Text", "Search...")),
            ("button_text", FieldDef::text("Button Text", "Search")),
            ("show_icon", FieldDef::toggle("Show Search Icon", true)),
            ("action_url", FieldDef::url("Action URL", "/search")),
            ("input_name", FieldDef::text("Input Name", "q")),
            ("open_in_new_tab", FieldDef::toggle("Open Results in New Tab", false)),
            ("method", FieldDef::select("Form Method", &[("get", "GET"), ("post", "POST")], "get")),
            (
                "layout",
                FieldDef::select(
                    "Layout",
                    &[("inline", "Inline"), ("stacked", "Stacked"), ("fullwidth", "Full Width")],
                    "inline",
                ),
            ),
            (
                "button_style",
                FieldDef::select(
                    "Button Style",
                    &[("filled", "Filled"), ("outline", "Outline"), ("icon-only", "Icon Only")],
                    "filled",
                ),
            ),
            ("input_bg_color", FieldDef::color("Input Background", "#ffffff")),
            ("input_text_color", FieldDef::color("Input Text Color", "#333333")),
            ("input_border_color", FieldDef::color("Input Border Color", "#cccccc")),
            ("input_focus_border_color", FieldDef::color("Input Focus Border Color", "#2563eb")),
            ("button_bg_color", FieldDef::color("Button Background", "#2563eb")),
            ("button_text_color", FieldDef::color("Button Text Color", "#ffffff")),
            ("button_hover_bg_color", FieldDef::color("Button Hover Background", "#1d4ed8")),
            ("field_radius", FieldDef::range("Border Radius", 8.0, 0.0, 50.0, "px")),
            ("field_font_size", FieldDef::range("Font Size", 16.0, 10.0, 32.0, "px").responsive()),
            ("gap", FieldDef::range("Gap Between Elements", 8.0, 0.0, 48.0, "px")),
            ("search_max_width", FieldDef::text("Max Width", "500px")),
            ("alignment", FieldDef::select("Alignment", ALIGN_OPTIONS, "left")),
        ]
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let layout = match attrs.text("layout").as_str() {
            l @ ("stacked" | "fullwidth") => l.to_string(),
            _ => "inline".to_string(),
        };
        let method = if attrs.text("method") == "post" { "post" } else { "get" };
        let style = attrs.text_or("button_style", "filled");
        let align = match attrs.text("alignment").as_str() {
            "center" => " jtb-align-center",
            "right" => " jtb-align-right",
            _ => "",
        };
        let placeholder = escape(&attrs.text("placeholder"));
        let input_name: String = attrs
            .text_or("input_name", "q")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let input_name = if input_name.is_empty() { "q".to_string() } else { input_name };
        let target = if attrs.bool("open_in_new_tab") { " target=\"_blank\"" } else { "" };

        let mut html = format!("<div class=\"jtb-search{}\">", align);
        html.push_str(&format!(
            "<form class=\"jtb-search-form jtb-search-{}\" action=\"{}\" method=\"{}\" role=\"search\"{}>",
            layout,
            escape(&safe_url(&attrs.text_or("action_url", "/search"))),
            method,
            target
        ));
        html.push_str(&format!(
            "<input type=\"search\" name=\"{}\" class=\"jtb-search-input\" placeholder=\"{}\" aria-label=\"{}\">",
            input_name, placeholder, placeholder
        ));
        let style_class = match style.as_str() {
            "outline" => "outline",
            "icon-only" => "icon-only",
            _ => "filled",
        };
        html.push_str(&format!(
            "<button type=\"submit\" class=\"jtb-search-button jtb-search-button-{}\">",
            style_class
        ));
        if attrs.bool("show_icon") || style == "icon-only" {
            html.push_str(SEARCH_ICON);
        }
        let button_text = attrs.text("button_text");
        if style != "icon-only" && !button_text.is_empty() {
            html.push_str(&format!("<span class=\"jtb-search-button-text\">{}</span>", escape(&button_text)));
        } else {
            html.push_str(&format!("<span class=\"jtb-sr-only\">{}</span>", escape(&attrs.text_or("button_text", "Search"))));
        }
        html.push_str("</button></form></div>");
        html
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let radius = format!("{}px", attrs.number_or("field_radius", 8.0));
        let button_bg = attrs.text_or("button_bg_color", "#2563eb");
        let button_fg = attrs.text_or("button_text_color", "#ffffff");
        let style = attrs.text_or("button_style", "filled");

        let max_width = if attrs.text("layout") == "fullwidth" {
            "100%".to_string()
        } else {
            clean(&attrs.text_or("search_max_width", "500px"))
        };
        let mut wrapper = Declarations::new();
        wrapper.push("max-width", max_width);
        match attrs.text("alignment").as_str() {
            "center" => {
                wrapper.push("margin-left", "auto").push("margin-right", "auto");
            }
            "right" => {
                wrapper.push("margin-left", "auto");
            }
            _ => {}
        }
        css.desktop(selector, &wrapper);

        let mut form = Declarations::new();
        form.push("display", "flex")
            .push("gap", format!("{}px", attrs.number_or("gap", 8.0)));
        if attrs.text("layout") == "stacked" {
            form.push("flex-direction", "column");
        }
        css.desktop(&format!("{} .jtb-search-form", selector), &form);

        let mut input = Declarations::new();
        input
            .push("flex", "1")
            .push("min-width", "0")
            .push("padding", "12px 16px")
            .push("color", clean(&attrs.text("input_text_color")))
            .push("background-color", clean(&attrs.text("input_bg_color")))
            .push("border", format!("1px solid {}", clean(&attrs.text_or("input_border_color", "#cccccc"))))
            .push("border-radius", radius.clone())
            .push("outline", "none")
            .push("transition", "border-color 0.2s, box-shadow 0.2s");
        css.desktop(&format!("{} .jtb-search-input", selector), &input);

        let focus_color = attrs.text_or("input_focus_border_color", "#2563eb");
        let mut focus = Declarations::new();
        focus.push("border-color", clean(&focus_color));
        if let Some(ring) = hex_to_rgba(&focus_color, 0.1) {
            focus.push("box-shadow", format!("0 0 0 3px {}", ring));
        }
        css.desktop(&format!("{} .jtb-search-input:focus", selector), &focus);

        let mut button = Declarations::new();
        button
            .push("display", "inline-flex")
            .push("align-items", "center")
            .push("justify-content", "center")
            .push("gap", "8px")
            .push("border-radius", radius)
            .push("cursor", "pointer")
            .push("transition", "background-color 0.2s, border-color 0.2s");
        match style.as_str() {
            "outline" => {
                button
                    .push("padding", "12px 24px")
                    .push("background-color", "transparent")
                    .push("color", clean(&button_bg))
                    .push("border", format!("2px solid {}", clean(&button_bg)));
            }
            "icon-only" => {
                button
                    .push("padding", "12px")
                    .push("background-color", clean(&button_bg))
                    .push("color", clean(&button_fg))
                    .push("border", "none");
            }
            _ => {
                button
                    .push("padding", "12px 24px")
                    .push("background-color", clean(&button_bg))
                    .push("color", clean(&button_fg))
                    .push("border", "none");
            }
        }
        css.desktop(&format!("{} .jtb-search-button", selector), &button);

        let mut hover = Declarations::new();
        if style == "outline" {
            hover
                .push("background-color", clean(&button_bg))
                .push("color", clean(&button_fg));
        } else {
            hover.push("background-color", clean(&attrs.text_or("button_hover_bg_color", "#1d4ed8")));
        }
        css.desktop(&format!("{} .jtb-search-button:hover", selector), &hover);

        for device in crate::attrs::Device::ALL {
            if let Some(size) = attrs
                .responsive("field_font_size", device)
                .and_then(|v| crate::css::length(v, "px"))
            {
                let mut decls = Declarations::new();
                decls.push("font-size", size);
                css.rule(device, &format!("{} .jtb-search-input, {} .jtb-search-button", selector, selector), &decls);
            }
        }

        let mut sr = Declarations::new();
        sr.push("position", "absolute")
            .push("width", "1px")
            .push("height", "1px")
            .push("overflow", "hidden")
            .push("clip", "rect(0,0,0,0)");
        css.desktop(&format!("{} .jtb-sr-only", selector), &sr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        Search.with_defaults(&Attrs::from_value(value).unwrap())
    }

    #[test]
    fn test_default_form() {
        let html = Search.render(&attrs(json!({})), "");
        assert!(html.starts_with(
            "<div class=\"jtb-search\"><form class=\"jtb-search-form jtb-search-inline\" action=\"/search\" method=\"get\" role=\"search\">"
        ));
        assert!(html.contains("name=\"q\""));
        assert!(html.contains("placeholder=\"Search...\""));
        assert!(html.contains("jtb-search-icon"));
        assert!(html.contains("<span class=\"jtb-search-button-text\">Search</span>"));
    }

    #[test]
    fn test_icon_only_hides_label_visually() {
        let html = Search.render(&attrs(json!({"button_style": "icon-only", "show_icon": false})), "");
        assert!(html.contains("jtb-search-icon"));
        assert!(html.contains("<span class=\"jtb-sr-only\">Search</span>"));
        assert!(!html.contains("jtb-search-button-text"));
    }

    #[test]
    fn test_input_name_sanitized_and_method() {
        let html = Search.render(&attrs(json!({"input_name": "s\" onfocus=\"x", "method": "post"})), "");
        assert!(html.contains("name=\"sonfocusx\""));
        assert!(html.contains("method=\"post\""));
    }

    #[test]
    fn test_outline_hover_inverts() {
        let css = Search.generate_css(&attrs(json!({"button_style": "outline"})), "#q");
        assert!(css.contains("#q .jtb-search-button:hover { background-color: #2563eb; color: #ffffff; }"));
        assert!(css.contains("border: 2px solid #2563eb"));
    }

    #[test]
    fn test_stacked_layout_and_alignment() {
        let css = Search.generate_css(&attrs(json!({"layout": "stacked", "alignment": "center"})), "#q");
        assert!(css.contains("#q { max-width: 500px; margin-left: auto; margin-right: auto; }"));
        assert!(css.contains("#q .jtb-search-form { display: flex; gap: 8px; flex-direction: column; }"));
    }
}
