use crate::attrs::Attrs;
use crate::css::{clean, hex_to_rgba, CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{attr, escape, safe_url};
use crate::style_config::StyleRule;

use super::contact_form::HONEYPOT_FIELD;

pub struct Signup;

const LAYOUTS: &[(&str, &str)] = &[
    ("inline", "Inline (Side by Side)"),
    ("stacked", "Stacked (Vertical)"),
    ("minimal", "Minimal (Email Only)"),
    ("card", "Card Style"),
    ("split", "Split (Image + Form)"),
];

const MAX_WIDTHS: &[(&str, &str)] = &[
    ("sm", "Small (480px)"),
    ("md", "Medium (600px)"),
    ("lg", "Large (800px)"),
    ("xl", "Extra Large (1000px)"),
    ("full", "Full Width"),
];

fn max_width(key: &str) -> &'static str {
    match key {
        "sm" => "480px",
        "lg" => "800px",
        "xl" => "1000px",
        "full" => "100%",
        _ => "600px",
    }
}

const STYLE: &[StyleRule] = &[
    StyleRule::new("title_color", "color", " .jtb-signup-title"),
    StyleRule::new("title_font_size", "font-size", " .jtb-signup-title").unit("px").responsive(),
    StyleRule::new("description_color", "color", " .jtb-signup-description"),
    StyleRule::new("input_bg_color", "background-color", " .jtb-signup-input"),
    StyleRule::new("input_text_color", "color", " .jtb-signup-input"),
    StyleRule::new("input_border_color", "border-color", " .jtb-signup-input"),
    StyleRule::new("button_bg_color", "background-color", " .jtb-signup-button").hover(),
    StyleRule::new("button_text_color", "color", " .jtb-signup-button").hover(),
    StyleRule::new("privacy_color", "color", " .jtb-signup-privacy"),
];

impl Element for Signup {
    fn slug(&self) -> &'static str {
        "signup"
    }

    fn name(&self) -> &'static str {
        "Email Signup"
    }

    fn icon(&self) -> &'static str {
        "at-sign"
    }

    fn category(&self) -> Category {
        Category::Forms
    }

    fn fields(&self) -> Schema {
        vec![
            ("title", FieldDef::text("Title", "Subscribe to Our Newsletter")),
            (
                "description",
                FieldDef::textarea(
                    "Description",
                    "Get the latest updates, tips, and exclusive content delivered straight to your inbox.",
                ),
            ),
            ("layout", FieldDef::select("Layout", LAYOUTS, "stacked")),
            (
                "show_name_field",
                FieldDef::select(
                    "Show Name Field",
                    &[("no", "No"), ("yes", "Yes"), ("first_last", "First & Last Name")],
                    "no",
                ),
            ),
            ("email_placeholder", FieldDef::text("Email Placeholder", "Enter your email address")),
            ("name_placeholder", FieldDef::text("Name Placeholder", "Your name").show_if("show_name_field", &["yes"])),
            (
                "first_name_placeholder",
                FieldDef::text("First Name Placeholder", "First name").show_if("show_name_field", &["first_last"]),
            ),
            (
                "last_name_placeholder",
                FieldDef::text("Last Name Placeholder", "Last name").show_if("show_name_field", &["first_last"]),
            ),
            ("button_text", FieldDef::text("Button Text", "Subscribe")),
            ("success_message", FieldDef::text("Success Message", "Thank you for subscribing!")),
            ("error_message", FieldDef::text("Error Message", "Something went wrong. Please try again.")),
            ("show_privacy_notice", FieldDef::toggle("Show Privacy Notice", true)),
            (
                "privacy_text",
                FieldDef::text("Privacy Text", "We respect your privacy. Unsubscribe at any time.")
                    .show_if("show_privacy_notice", &["true"]),
            ),
            ("show_checkbox", FieldDef::toggle("Show Consent Checkbox", false)),
            (
                "checkbox_text",
                FieldDef::text("Checkbox Text", "I agree to receive marketing emails").show_if("show_checkbox", &["true"]),
            ),
            ("form_action", FieldDef::url("Form Action URL", "/forms/signup")),
            ("image_url", FieldDef::url("Image URL", "").blank().show_if("layout", &["split"])),
            (
                "image_position",
                FieldDef::select("Image Position", &[("left", "Left"), ("right", "Right")], "left")
                    .show_if("layout", &["split"]),
            ),
            ("show_subscriber_count", FieldDef::toggle("Show Subscriber Count", false)),
            (
                "subscriber_count",
                FieldDef::text("Subscriber Count Text", "Join 10,000+ subscribers")
                    .show_if("show_subscriber_count", &["true"]),
            ),
            ("max_width", FieldDef::select("Max Width", MAX_WIDTHS, "md")),
            (
                "content_align",
                FieldDef::select("Text Alignment", super::ALIGN_OPTIONS, "center"),
            ),
            ("field_gap", FieldDef::range("Field Gap", 12.0, 0.0, 48.0, "px")),
            ("title_color", FieldDef::color("Title Color", "#111827")),
            ("title_font_size", FieldDef::range("Title Font Size", 32.0, 12.0, 72.0, "px").responsive()),
            ("description_color", FieldDef::color("Description Color", "#6b7280")),
            ("input_bg_color", FieldDef::color("Input Background", "#ffffff")),
            ("input_text_color", FieldDef::color("Input Text Color", "#111827")),
            ("input_border_color", FieldDef::color("Input Border Color", "#d1d5db")),
            ("input_focus_border", FieldDef::color("Input Focus Border", "#2563eb")),
            ("button_bg_color", FieldDef::color("Button Background", "#2563eb").hover()),
            ("button_text_color", FieldDef::color("Button Text Color", "#ffffff").hover()),
            ("button_full_width", FieldDef::toggle("Full Width Button", false)),
            ("privacy_color", FieldDef::color("Privacy Text Color", "#9ca3af")),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let layout = match attrs.text("layout").as_str() {
            l @ ("inline" | "minimal" | "card" | "split") => l.to_string(),
            _ => "stacked".to_string(),
        };
        let mut html = format!("<div class=\"jtb-signup jtb-signup-{}\">", layout);

        let image_right = attrs.text("image_position") == "right";
        let image = if layout == "split" {
            let src = attrs.str("image_url").map(safe_url).unwrap_or_default();
            let inner = if src.is_empty() {
                String::new()
            } else {
                format!("<img src=\"{}\" alt=\"\" loading=\"lazy\">", escape(&src))
            };
            Some(format!("<div class=\"jtb-signup-image\">{}</div>", inner))
        } else {
            None
        };
        if let Some(image) = &image {
            html.push_str("<div class=\"jtb-signup-split\">");
            if !image_right {
                html.push_str(image);
            }
        }

        html.push_str("<div class=\"jtb-signup-inner\">");

        if attrs.bool("show_subscriber_count") {
            html.push_str(&format!(
                "<p class=\"jtb-signup-count\">{}</p>",
                escape(&attrs.text("subscriber_count"))
            ));
        }
        let title = attrs.text("title");
        if !title.is_empty() {
            html.push_str(&format!("<h3 class=\"jtb-signup-title\">{}</h3>", escape(&title)));
        }
        let description = attrs.text("description");
        if !description.is_empty() && layout != "minimal" {
            html.push_str(&format!(
                "<p class=\"jtb-signup-description\">{}</p>",
                escape(&description)
            ));
        }

        html.push_str(&format!(
            "<form class=\"jtb-signup-form\" method=\"post\" action=\"{}\" data-success-message=\"{}\" data-error-message=\"{}\">",
            escape(&safe_url(&attrs.text_or("form_action", "/forms/signup"))),
            escape(&attrs.text("success_message")),
            escape(&attrs.text("error_message")),
        ));
        html.push_str("<div class=\"jtb-signup-fields\">");

        if layout != "minimal" {
            match attrs.text("show_name_field").as_str() {
                "yes" => html.push_str(&text_input("name", &attrs.text("name_placeholder"))),
                "first_last" => {
                    html.push_str("<div class=\"jtb-signup-name-row\">");
                    html.push_str(&text_input("first_name", &attrs.text("first_name_placeholder")));
                    html.push_str(&text_input("last_name", &attrs.text("last_name_placeholder")));
                    html.push_str("</div>");
                }
                _ => {}
            }
        }

        html.push_str(&format!(
            "<input type=\"email\" name=\"email\" class=\"jtb-signup-input jtb-signup-email\"{} required>",
            attr("placeholder", &attrs.text("email_placeholder"))
        ));
        html.push_str(&format!(
            "<button type=\"submit\" class=\"jtb-signup-button\">{}</button>",
            escape(&attrs.text_or("button_text", "Subscribe"))
        ));
        html.push_str("</div>");

        if attrs.bool("show_checkbox") {
            html.push_str(&format!(
                "<label class=\"jtb-signup-consent\"><input type=\"checkbox\" name=\"consent\" value=\"1\" required><span>{}</span></label>",
                escape(&attrs.text("checkbox_text"))
            ));
        }
        html.push_str(&format!(
            "<input type=\"text\" name=\"{}\" class=\"jtb-hp\" tabindex=\"-1\" autocomplete=\"off\" aria-hidden=\"true\">",
            HONEYPOT_FIELD
        ));
        html.push_str("<div class=\"jtb-form-message\" role=\"status\" hidden></div>");
        html.push_str("</form>");

        if attrs.bool("show_privacy_notice") {
            html.push_str(&format!(
                "<p class=\"jtb-signup-privacy\">{}</p>",
                escape(&attrs.text("privacy_text"))
            ));
        }
        html.push_str("</div>");

        if let Some(image) = &image {
            if image_right {
                html.push_str(image);
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let layout = attrs.text_or("layout", "stacked");
        let gap = format!("{}px", attrs.number_or("field_gap", 12.0));

        let mut inner = Declarations::new();
        inner
            .push("max-width", max_width(&attrs.text("max_width")))
            .push("margin", "0 auto")
            .push("text-align", clean(&attrs.text_or("content_align", "center")));
        if layout == "card" {
            inner
                .push("background", "#ffffff")
                .push("padding", "48px")
                .push("border-radius", "16px")
                .push("box-shadow", "0 10px 40px rgba(0,0,0,0.1)");
        }
        css.desktop(&format!("{} .jtb-signup-inner", selector), &inner);

        let mut fields = Declarations::new();
        fields.push("display", "flex").push("gap", gap.clone());
        if layout == "inline" || layout == "minimal" {
            fields.push("flex-direction", "row").push("flex-wrap", "wrap");
        } else {
            fields.push("flex-direction", "column");
        }
        css.desktop(&format!("{} .jtb-signup-fields", selector), &fields);

        let mut name_row = Declarations::new();
        name_row.push("display", "flex").push("gap", gap);
        css.desktop(&format!("{} .jtb-signup-name-row", selector), &name_row);

        let mut input = Declarations::new();
        input
            .push("flex", "1")
            .push("min-width", "200px")
            .push("padding", "14px 18px")
            .push("border", "1px solid")
            .push("border-radius", "8px")
            .push("box-sizing", "border-box");
        css.desktop(&format!("{} .jtb-signup-input", selector), &input);

        let focus_color = attrs.text_or("input_focus_border", "#2563eb");
        let mut focus = Declarations::new();
        focus.push("outline", "none").push("border-color", clean(&focus_color));
        if let Some(ring) = hex_to_rgba(&focus_color, 0.15) {
            focus.push("box-shadow", format!("0 0 0 3px {}", ring));
        }
        css.desktop(&format!("{} .jtb-signup-input:focus", selector), &focus);

        let mut button = Declarations::new();
        button
            .push("padding", "14px 28px")
            .push("border", "none")
            .push("border-radius", "8px")
            .push("font-weight", "600")
            .push("cursor", "pointer");
        if attrs.bool("button_full_width") && layout != "inline" {
            button.push("width", "100%");
        }
        css.desktop(&format!("{} .jtb-signup-button", selector), &button);

        if layout == "split" {
            let mut split = Declarations::new();
            split
                .push("display", "grid")
                .push("grid-template-columns", "1fr 1fr")
                .push("overflow", "hidden")
                .push("border-radius", "16px");
            css.desktop(&format!("{} .jtb-signup-split", selector), &split);

            let mut image = Declarations::new();
            image
                .push("min-height", "400px")
                .push("background", "linear-gradient(135deg, #667eea 0%, #764ba2 100%)");
            css.desktop(&format!("{} .jtb-signup-image", selector), &image);

            let mut img = Declarations::new();
            img.push("width", "100%").push("height", "100%").push("object-fit", "cover");
            css.desktop(&format!("{} .jtb-signup-image img", selector), &img);

            let mut stacked = Declarations::new();
            stacked.push("grid-template-columns", "1fr");
            css.rule(crate::attrs::Device::Phone, &format!("{} .jtb-signup-split", selector), &stacked);
        }

        let mut hp = Declarations::new();
        hp.push("position", "absolute").push("left", "-9999px");
        css.desktop(&format!("{} .jtb-hp", selector), &hp);
    }
}

fn text_input(name: &str, placeholder: &str) -> String {
    format!(
        "<input type=\"text\" name=\"{}\" class=\"jtb-signup-input\"{} required>",
        name,
        attr("placeholder", placeholder)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: serde_json::Value) -> String {
        let attrs = Signup.with_defaults(&Attrs::from_value(value).unwrap());
        Signup.render(&attrs, "")
    }

    #[test]
    fn test_default_render() {
        let html = render(json!({}));
        assert!(html.starts_with("<div class=\"jtb-signup jtb-signup-stacked\"><div class=\"jtb-signup-inner\">"));
        assert!(html.contains("<h3 class=\"jtb-signup-title\">Subscribe to Our Newsletter</h3>"));
        assert!(html.contains("action=\"/forms/signup\""));
        assert!(html.contains("placeholder=\"Enter your email address\""));
        assert!(html.contains(">Subscribe</button>"));
        assert!(html.contains("jtb-signup-privacy"));
        assert!(!html.contains("name=\"consent\""));
        assert!(!html.contains("name=\"name\""));
    }

    #[test]
    fn test_minimal_hides_description_and_names() {
        let html = render(json!({"layout": "minimal", "show_name_field": "yes"}));
        assert!(!html.contains("jtb-signup-description"));
        assert!(!html.contains("name=\"name\""));
    }

    #[test]
    fn test_first_last_name_fields() {
        let html = render(json!({"show_name_field": "first_last"}));
        assert!(html.contains("name=\"first_name\""));
        assert!(html.contains("placeholder=\"Last name\""));
    }

    #[test]
    fn test_consent_checkbox() {
        let html = render(json!({"show_checkbox": "yes"}));
        assert!(html.contains("<input type=\"checkbox\" name=\"consent\" value=\"1\" required><span>I agree to receive marketing emails</span>"));
    }

    #[test]
    fn test_split_layout_image_order() {
        let left = render(json!({"layout": "split", "image_url": "/uploads/hero.jpg"}));
        assert!(left.contains("<div class=\"jtb-signup-split\"><div class=\"jtb-signup-image\"><img src=\"/uploads/hero.jpg\""));

        let right = render(json!({"layout": "split", "image_position": "right"}));
        assert!(right.contains("</div><div class=\"jtb-signup-image\"></div></div></div>"));
    }

    #[test]
    fn test_unknown_layout_falls_back_to_stacked() {
        assert!(render(json!({"layout": "bogus"})).contains("jtb-signup-stacked"));
    }

    #[test]
    fn test_css_inline_layout_is_row() {
        let attrs = Signup.with_defaults(&Attrs::from_value(json!({"layout": "inline", "max_width": "lg"})).unwrap());
        let css = Signup.generate_css(&attrs, "#s");
        assert!(css.contains("#s .jtb-signup-fields { display: flex; gap: 12px; flex-direction: row; flex-wrap: wrap; }"));
        assert!(css.contains("#s .jtb-signup-inner { max-width: 800px; margin: 0 auto; text-align: center; }"));
    }
}
