use crate::attrs::Attrs;
use crate::css::{clean, hex_to_rgba, CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{attr, escape, safe_url};
use crate::style_config::StyleRule;

use super::ALIGN_OPTIONS;

pub struct Login;

const STYLE: &[StyleRule] = &[
    StyleRule::new("form_bg_color", "background-color", " .jtb-login-form"),
    StyleRule::new("form_padding", "padding", " .jtb-login-form").unit("px"),
    StyleRule::new("form_border_radius", "border-radius", " .jtb-login-form").unit("px"),
    StyleRule::new("form_max_width", "max-width", " .jtb-login-form").unit("px").responsive(),
    StyleRule::new("title_color", "color", " .jtb-login-title"),
    StyleRule::new("title_font_size", "font-size", " .jtb-login-title").unit("px"),
    StyleRule::new("label_color", "color", " .jtb-login-label"),
    StyleRule::new("input_bg_color", "background-color", " .jtb-login-input"),
    StyleRule::new("input_text_color", "color", " .jtb-login-input"),
    StyleRule::new("input_border_color", "border-color", " .jtb-login-input"),
    StyleRule::new("button_bg_color", "background-color", " .jtb-login-button").hover(),
    StyleRule::new("button_text_color", "color", " .jtb-login-button"),
    StyleRule::new("link_color", "color", " .jtb-login-forgot").hover(),
];

fn shadow(key: &str) -> Option<&'static str> {
    match key {
        "sm" => Some("0 1px 3px rgba(0,0,0,0.1)"),
        "md" => Some("0 4px 6px rgba(0,0,0,0.1)"),
        "lg" => Some("0 10px 25px rgba(0,0,0,0.15)"),
        _ => None,
    }
}

impl Element for Login {
    fn slug(&self) -> &'static str {
        "login"
    }

    fn name(&self) -> &'static str {
        "Login"
    }

    fn icon(&self) -> &'static str {
        "log-in"
    }

    fn category(&self) -> Category {
        Category::Forms
    }

    fn fields(&self) -> Schema {
        vec![
            ("title", FieldDef::text("Form Title", "Login")),
            ("show_title", FieldDef::toggle("Show Title", true)),
            ("username_label", FieldDef::text("Username Label", "Username")),
            ("username_placeholder", FieldDef::text("Username Placeholder", "Enter username")),
            ("password_label", FieldDef::text("Password Label", "Password")),
            ("password_placeholder", FieldDef::text("Password Placeholder", "Enter password")),
            ("button_text", FieldDef::text("Button Text", "Log In")),
            ("show_remember_me", FieldDef::toggle("Show Remember Me", true)),
            ("remember_me_text", FieldDef::text("Remember Me Text", "Remember me").show_if("show_remember_me", &["true"])),
            ("show_forgot_password", FieldDef::toggle("Show Forgot Password", true)),
            (
                "forgot_password_text",
                FieldDef::text("Forgot Password Text", "Forgot password?").show_if("show_forgot_password", &["true"]),
            ),
            (
                "forgot_password_url",
                FieldDef::url("Forgot Password URL", "/forgot-password").show_if("show_forgot_password", &["true"]),
            ),
            ("action_url", FieldDef::url("Form Action URL", "/admin/login")),
            ("redirect_url", FieldDef::url("Redirect After Login", "").blank()),
            ("form_bg_color", FieldDef::color("Form Background", "#ffffff")),
            ("form_padding", FieldDef::range("Form Padding", 24.0, 0.0, 80.0, "px")),
            ("form_border_radius", FieldDef::range("Form Border Radius", 8.0, 0.0, 40.0, "px")),
            (
                "form_shadow",
                FieldDef::select(
                    "Form Shadow",
                    &[("none", "None"), ("sm", "Small"), ("md", "Medium"), ("lg", "Large")],
                    "md",
                ),
            ),
            ("form_max_width", FieldDef::range("Form Max Width", 360.0, 200.0, 800.0, "px").responsive()),
            ("title_color", FieldDef::color("Title Color", "#111827")),
            ("title_font_size", FieldDef::range("Title Font Size", 20.0, 12.0, 48.0, "px")),
            ("label_color", FieldDef::color("Label Color", "#374151")),
            ("input_bg_color", FieldDef::color("Input Background", "#f9fafb")),
            ("input_text_color", FieldDef::color("Input Text Color", "#111827")),
            ("input_border_color", FieldDef::color("Input Border Color", "#d1d5db")),
            ("input_focus_border_color", FieldDef::color("Input Focus Border", "#2563eb")),
            ("button_bg_color", FieldDef::color("Button Background", "#2563eb").hover()),
            ("button_text_color", FieldDef::color("Button Text Color", "#ffffff")),
            ("link_color", FieldDef::color("Link Color", "#2563eb").hover()),
            ("field_spacing", FieldDef::range("Field Spacing", 16.0, 0.0, 48.0, "px")),
            ("alignment", FieldDef::select("Form Alignment", ALIGN_OPTIONS, "center")),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let mut html = format!(
            "<div class=\"jtb-login jtb-align-{}\"><form class=\"jtb-login-form\" method=\"post\" action=\"{}\">",
            match attrs.text("alignment").as_str() {
                "left" => "left",
                "right" => "right",
                _ => "center",
            },
            escape(&safe_url(&attrs.text_or("action_url", "/admin/login")))
        );

        if attrs.bool("show_title") {
            let title = attrs.text("title");
            if !title.is_empty() {
                html.push_str(&format!("<h3 class=\"jtb-login-title\">{}</h3>", escape(&title)));
            }
        }

        if let Some(redirect) = attrs.str("redirect_url") {
            html.push_str(&format!(
                "<input type=\"hidden\" name=\"redirect_url\" value=\"{}\">",
                escape(&safe_url(redirect))
            ));
        }

        for (name, kind, label, placeholder, autocomplete) in [
            ("username", "text", "username_label", "username_placeholder", "username"),
            ("password", "password", "password_label", "password_placeholder", "current-password"),
        ] {
            html.push_str(&format!(
                "<div class=\"jtb-login-field\"><label class=\"jtb-login-label\" for=\"jtb-login-{name}\">{}</label>\
                 <input type=\"{kind}\" id=\"jtb-login-{name}\" name=\"{name}\" class=\"jtb-login-input\"{} autocomplete=\"{autocomplete}\" required></div>",
                escape(&attrs.text(label)),
                attr("placeholder", &attrs.text(placeholder)),
            ));
        }

        let remember = attrs.bool("show_remember_me");
        let forgot = attrs.bool("show_forgot_password");
        if remember || forgot {
            html.push_str("<div class=\"jtb-login-options\">");
            if remember {
                html.push_str(&format!(
                    "<label class=\"jtb-login-remember\"><input type=\"checkbox\" name=\"remember_me\" value=\"1\"><span>{}</span></label>",
                    escape(&attrs.text("remember_me_text"))
                ));
            }
            if forgot {
                html.push_str(&format!(
                    "<a class=\"jtb-login-forgot\" href=\"{}\">{}</a>",
                    escape(&safe_url(&attrs.text_or("forgot_password_url", "/forgot-password"))),
                    escape(&attrs.text("forgot_password_text"))
                ));
            }
            html.push_str("</div>");
        }

        html.push_str(&format!(
            "<button type=\"submit\" class=\"jtb-login-button\">{}</button>",
            escape(&attrs.text_or("button_text", "Log In"))
        ));
        html.push_str("<div class=\"jtb-form-message\" role=\"alert\" hidden></div>");
        html.push_str("</form></div>");
        html
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let mut form = Declarations::new();
        form.push("width", "100%");
        match attrs.text("alignment").as_str() {
            "left" => form.push("margin-right", "auto"),
            "right" => form.push("margin-left", "auto"),
            _ => form.push("margin", "0 auto"),
        };
        if let Some(shadow) = shadow(&attrs.text("form_shadow")) {
            form.push("box-shadow", shadow);
        }
        css.desktop(&format!("{} .jtb-login-form", selector), &form);

        let spacing = format!("{}px", attrs.number_or("field_spacing", 16.0));
        let mut field = Declarations::new();
        field.push("margin-bottom", spacing);
        css.desktop(&format!("{} .jtb-login-field", selector), &field);

        let mut label = Declarations::new();
        label.push("display", "block").push("margin-bottom", "6px").push("font-size", "14px");
        css.desktop(&format!("{} .jtb-login-label", selector), &label);

        let mut input = Declarations::new();
        input
            .push("width", "100%")
            .push("padding", "10px 12px")
            .push("border", "1px solid")
            .push("border-radius", "4px")
            .push("box-sizing", "border-box");
        css.desktop(&format!("{} .jtb-login-input", selector), &input);

        let focus_color = attrs.text_or("input_focus_border_color", "#2563eb");
        let mut focus = Declarations::new();
        focus.push("outline", "none").push("border-color", clean(&focus_color));
        if let Some(ring) = hex_to_rgba(&focus_color, 0.1) {
            focus.push("box-shadow", format!("0 0 0 3px {}", ring));
        }
        css.desktop(&format!("{} .jtb-login-input:focus", selector), &focus);

        let mut options = Declarations::new();
        options
            .push("display", "flex")
            .push("justify-content", "space-between")
            .push("align-items", "center")
            .push("font-size", "14px")
            .push("margin-bottom", "16px");
        css.desktop(&format!("{} .jtb-login-options", selector), &options);

        let mut button = Declarations::new();
        button
            .push("width", "100%")
            .push("padding", "12px 16px")
            .push("border", "none")
            .push("border-radius", "4px")
            .push("cursor", "pointer");
        css.desktop(&format!("{} .jtb-login-button", selector), &button);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        Login.with_defaults(&Attrs::from_value(value).unwrap())
    }

    #[test]
    fn test_default_render() {
        let html = Login.render(&attrs(json!({})), "");
        assert!(html.starts_with(
            "<div class=\"jtb-login jtb-align-center\"><form class=\"jtb-login-form\" method=\"post\" action=\"/admin/login\"><h3 class=\"jtb-login-title\">Login</h3>"
        ));
        assert!(html.contains("type=\"password\" id=\"jtb-login-password\" name=\"password\""));
        assert!(html.contains("autocomplete=\"current-password\""));
        assert!(html.contains("name=\"remember_me\""));
        assert!(html.contains("<a class=\"jtb-login-forgot\" href=\"/forgot-password\">Forgot password?</a>"));
        assert!(html.contains(">Log In</button>"));
        assert!(!html.contains("redirect_url"));
    }

    #[test]
    fn test_options_row_omitted() {
        let html = Login.render(
            &attrs(json!({"show_remember_me": false, "show_forgot_password": "no", "show_title": false})),
            "",
        );
        assert!(!html.contains("jtb-login-options"));
        assert!(!html.contains("jtb-login-title"));
    }

    #[test]
    fn test_redirect_field() {
        let html = Login.render(&attrs(json!({"redirect_url": "/admin"})), "");
        assert!(html.contains("<input type=\"hidden\" name=\"redirect_url\" value=\"/admin\">"));
    }

    #[test]
    fn test_css_form_width_and_shadow() {
        let css = Login.generate_css(&attrs(json!({"form_max_width__phone": 300})), "#l");
        assert!(css.contains("max-width: 360px"));
        assert!(css.contains("#l .jtb-login-form { width: 100%; margin: 0 auto; box-shadow: 0 4px 6px rgba(0,0,0,0.1); }"));
        assert!(css.contains("@media (max-width: 767px) {\n  #l .jtb-login-form { max-width: 300px; }\n}"));
    }
}
