use crate::attrs::Attrs;
use crate::css::{hex_to_rgba, CssBuilder, Declarations};
use crate::element::{Category, Element, Features};
use crate::fields::{FieldDef, Schema};
use crate::html::{attr, escape, safe_url};
use crate::style_config::StyleRule;

/// Name of the hidden field bots tend to fill in.
pub const HONEYPOT_FIELD: &str = "website";

pub struct ContactForm;
pub struct ContactFormField;

const FIELD_TYPES: &[(&str, &str)] = &[
    ("input", "Text"),
    ("email", "Email"),
    ("textarea", "Textarea"),
    ("select", "Select"),
    ("radio", "Radio Buttons"),
    ("checkbox", "Checkboxes"),
    ("number", "Number"),
    ("phone", "Phone"),
    ("url", "URL"),
    ("date", "Date"),
    ("time", "Time"),
    ("file", "File Upload"),
];

/// One form control with its label.
pub(crate) struct FormControl<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub kind: &'a str,
    pub required: bool,
    pub placeholder: &'a str,
    pub options: Vec<&'a str>,
    pub rows: u32,
    pub accept: &'a str,
    pub fullwidth: bool,
}

impl<'a> FormControl<'a> {
    pub fn new(id: &'a str, title: &'a str, kind: &'a str) -> Self {
        Self {
            id,
            title,
            kind,
            required: false,
            placeholder: "",
            options: Vec::new(),
            rows: 5,
            accept: "",
            fullwidth: false,
        }
    }

    pub fn render(&self) -> String {
        let id = escape(self.id);
        let required = if self.required { " required" } else { "" };
        let placeholder = attr("placeholder", self.placeholder);

        let mut html = format!(
            "<div class=\"jtb-form-field{}\" data-field-id=\"{}\">",
            if self.fullwidth { " jtb-field-fullwidth" } else { "" },
            id
        );
        html.push_str(&format!("<label class=\"jtb-field-label\" for=\"{}\">{}", id, escape(self.title)));
        if self.required {
            html.push_str("<span class=\"jtb-required\">*</span>");
        }
        html.push_str("</label>");

        match self.kind {
            "textarea" => html.push_str(&format!(
                "<textarea id=\"{id}\" name=\"{id}\" class=\"jtb-field-input jtb-field-textarea\"{placeholder}{required} rows=\"{}\"></textarea>",
                self.rows.max(1)
            )),
            "select" => {
                html.push_str(&format!(
                    "<select id=\"{id}\" name=\"{id}\" class=\"jtb-field-input jtb-field-select\"{required}>"
                ));
                let prompt = if self.placeholder.is_empty() { "Select..." } else { self.placeholder };
                html.push_str(&format!("<option value=\"\">{}</option>", escape(prompt)));
                for opt in &self.options {
                    let opt = escape(opt);
                    html.push_str(&format!("<option value=\"{opt}\">{opt}</option>"));
                }
                html.push_str("</select>");
            }
            "radio" | "checkbox" => {
                let multi = if self.kind == "checkbox" { "[]" } else { "" };
                html.push_str("<div class=\"jtb-field-options\">");
                for (i, opt) in self.options.iter().enumerate() {
                    let opt = escape(opt);
                    html.push_str(&format!(
                        "<label class=\"jtb-option-label\"><input type=\"{}\" id=\"{id}_{i}\" name=\"{id}{multi}\" value=\"{opt}\"><span>{opt}</span></label>",
                        self.kind
                    ));
                }
                html.push_str("</div>");
            }
            "file" => {
                let accept = self
                    .accept
                    .split(',')
                    .map(str::trim)
                    .filter(|ext| !ext.is_empty())
                    .map(|ext| format!(".{}", ext.trim_start_matches('.')))
                    .collect::<Vec<_>>()
                    .join(",");
                html.push_str(&format!(
                    "<input type=\"file\" id=\"{id}\" name=\"{id}\" class=\"jtb-field-input jtb-field-file\"{}{required}>",
                    attr("accept", &accept)
                ));
            }
            "date" | "time" => html.push_str(&format!(
                "<input type=\"{}\" id=\"{id}\" name=\"{id}\" class=\"jtb-field-input\"{required}>",
                self.kind
            )),
            other => {
                let input_type = match other {
                    "email" => "email",
                    "number" => "number",
                    "phone" => "tel",
                    "url" => "url",
                    _ => "text",
                };
                html.push_str(&format!(
                    "<input type=\"{input_type}\" id=\"{id}\" name=\"{id}\" class=\"jtb-field-input\"{placeholder}{required}>"
                ));
            }
        }

        html.push_str("</div>");
        html
    }
}

fn field_name(attrs: &Attrs) -> String {
    let raw = attrs.text("field_id");
    let source = if raw.trim().is_empty() {
        attrs.text_or("field_title", "field")
    } else {
        raw
    };
    let cleaned: String = source
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "field".to_string()
    } else {
        cleaned
    }
}

const FIELD_STYLE: &[StyleRule] = &[
    StyleRule::new("label_color", "color", " .jtb-field-label"),
    StyleRule::new("input_background", "background-color", " .jtb-field-input"),
    StyleRule::new("input_text_color", "color", " .jtb-field-input"),
    StyleRule::new("input_border_color", "border-color", " .jtb-field-input"),
    StyleRule::new("input_focus_border", "border-color", " .jtb-field-input:focus"),
];

impl Element for ContactFormField {
    fn slug(&self) -> &'static str {
        "contact_form_field"
    }

    fn name(&self) -> &'static str {
        "Form Field"
    }

    fn icon(&self) -> &'static str {
        "edit-3"
    }

    fn category(&self) -> Category {
        Category::Forms
    }

    fn is_child(&self) -> bool {
        true
    }

    fn features(&self) -> Features {
        Features {
            spacing: true,
            ..Features::none()
        }
    }

    fn fields(&self) -> Schema {
        vec![
            ("field_id", FieldDef::text("Field ID", "").blank()),
            ("field_title", FieldDef::text("Field Title", "New Field")),
            ("field_type", FieldDef::select("Field Type", FIELD_TYPES, "input")),
            ("required_mark", FieldDef::toggle("Required", true)),
            ("field_placeholder", FieldDef::text("Placeholder", "").blank()),
            (
                "select_options",
                FieldDef::textarea("Options (one per line)", "")
                    .blank()
                    .show_if("field_type", &["select", "radio", "checkbox"]),
            ),
            (
                "allowed_extensions",
                FieldDef::text("Allowed Extensions", "jpg,png,pdf").show_if("field_type", &["file"]),
            ),
            ("fullwidth", FieldDef::toggle("Full Width", true)),
            ("label_color", FieldDef::color("Label Color", "").blank()),
            ("input_background", FieldDef::color("Input Background", "#ffffff")),
            ("input_text_color", FieldDef::color("Input Text Color", "#333333")),
            ("input_border_color", FieldDef::color("Input Border Color", "#dddddd")),
            ("input_focus_border", FieldDef::color("Focus Border Color", "#7c3aed")),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        FIELD_STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let id = field_name(attrs);
        let title = attrs.text_or("field_title", "Field");
        let kind = attrs.text_or("field_type", "input");
        let placeholder = attrs.text("field_placeholder");
        let raw_options = attrs.text("select_options");
        let accept = attrs.text_or("allowed_extensions", "jpg,png,pdf");

        let mut control = FormControl::new(&id, &title, &kind);
        control.required = attrs.bool("required_mark");
        control.placeholder = placeholder.as_str();
        control.options = raw_options
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        control.accept = accept.as_str();
        control.fullwidth = attrs.bool("fullwidth");
        control.render()
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let mut container = Declarations::new();
        container.push("margin-bottom", "20px");
        css.desktop(selector, &container);

        let mut label = Declarations::new();
        label
            .push("display", "block")
            .push("margin-bottom", "6px")
            .push("font-weight", "500");
        css.desktop(&format!("{} .jtb-field-label", selector), &label);

        let mut required = Declarations::new();
        required.push("color", "#ef4444").push("margin-left", "2px");
        css.desktop(&format!("{} .jtb-required", selector), &required);

        let mut input = Declarations::new();
        input
            .push("width", "100%")
            .push("padding", "12px 16px")
            .push("border", "1px solid")
            .push("border-radius", "6px")
            .push("font-size", "15px")
            .push("transition", "border-color 0.2s ease, box-shadow 0.2s ease");
        css.desktop(&format!("{} .jtb-field-input", selector), &input);

        let focus_color = attrs.text_or("input_focus_border", "#7c3aed");
        let ring = hex_to_rgba(&focus_color, 0.15).unwrap_or_else(|| "rgba(124, 58, 237, 0.15)".into());
        let mut focus = Declarations::new();
        focus
            .push("outline", "none")
            .push("box-shadow", format!("0 0 0 3px {}", ring));
        css.desktop(&format!("{} .jtb-field-input:focus", selector), &focus);

        let mut textarea = Declarations::new();
        textarea.push("resize", "vertical").push("min-height", "120px");
        css.desktop(&format!("{} .jtb-field-textarea", selector), &textarea);

        let mut options = Declarations::new();
        options
            .push("display", "flex")
            .push("flex-wrap", "wrap")
            .push("gap", "12px");
        css.desktop(&format!("{} .jtb-field-options", selector), &options);
    }
}

const FORM_STYLE: &[StyleRule] = &[
    StyleRule::new("title_color", "color", " .jtb-contact-form-title"),
    StyleRule::new("title_font_size", "font-size", " .jtb-contact-form-title").unit("px").responsive(),
    StyleRule::new("label_color", "color", " .jtb-field-label"),
    StyleRule::new("input_background", "background-color", " .jtb-field-input"),
    StyleRule::new("input_border_color", "border-color", " .jtb-field-input"),
    StyleRule::new("button_bg_color", "background-color", " .jtb-contact-form-button").hover(),
    StyleRule::new("button_text_color", "color", " .jtb-contact-form-button").hover(),
];

impl Element for ContactForm {
    fn slug(&self) -> &'static str {
        "contact_form"
    }

    fn name(&self) -> &'static str {
        "Contact Form"
    }

    fn icon(&self) -> &'static str {
        "mail"
    }

    fn category(&self) -> Category {
        Category::Forms
    }

    fn child_slug(&self) -> Option<&'static str> {
        Some("contact_form_field")
    }

    fn fields(&self) -> Schema {
        vec![
            ("form_title", FieldDef::text("Title", "Contact Us")),
            ("show_name", FieldDef::toggle("Show Name Field", true)),
            ("name_label", FieldDef::text("Name Label", "Name").show_if("show_name", &["true"])),
            ("name_placeholder", FieldDef::text("Name Placeholder", "Your name").show_if("show_name", &["true"])),
            ("show_email", FieldDef::toggle("Show Email Field", true)),
            ("email_label", FieldDef::text("Email Label", "Email").show_if("show_email", &["true"])),
            (
                "email_placeholder",
                FieldDef::text("Email Placeholder", "your@email.com").show_if("show_email", &["true"]),
            ),
            ("show_phone", FieldDef::toggle("Show Phone Field", false)),
            ("phone_label", FieldDef::text("Phone Label", "Phone").show_if("show_phone", &["true"])),
            ("phone_placeholder", FieldDef::text("Phone Placeholder", "").blank().show_if("show_phone", &["true"])),
            ("show_subject", FieldDef::toggle("Show Subject Field", true)),
            ("subject_label", FieldDef::text("Subject Label", "Subject").show_if("show_subject", &["true"])),
            ("subject_placeholder", FieldDef::text("Subject Placeholder", "").blank().show_if("show_subject", &["true"])),
            ("message_label", FieldDef::text("Message Label", "Message")),
            ("message_placeholder", FieldDef::text("Message Placeholder", "Your message")),
            ("message_rows", FieldDef::range("Message Rows", 5.0, 2.0, 20.0, "")),
            ("button_text", FieldDef::text("Button Text", "Send Message")),
            (
                "success_message",
                FieldDef::textarea("Success Message", "Thank you! Your message has been sent."),
            ),
            ("recipient_email", FieldDef::text("Recipient Email", "").blank()),
            ("title_color", FieldDef::color("Title Color", "").blank()),
            ("title_font_size", FieldDef::range("Title Font Size", 24.0, 12.0, 60.0, "px").responsive()),
            ("label_color", FieldDef::color("Label Color", "").blank()),
            ("input_background", FieldDef::color("Input Background", "#ffffff")),
            ("input_border_color", FieldDef::color("Input Border Color", "#dddddd")),
            ("button_bg_color", FieldDef::color("Button Background", "#2ea3f2").hover()),
            ("button_text_color", FieldDef::color("Button Text Color", "#ffffff").hover()),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        FORM_STYLE
    }

    fn render(&self, attrs: &Attrs, content: &str) -> String {
        let mut html = String::from("<div class=\"jtb-contact-form\">");

        let title = attrs.text("form_title");
        if !title.is_empty() {
            html.push_str(&format!("<h3 class=\"jtb-contact-form-title\">{}</h3>", escape(&title)));
        }

        html.push_str(&format!(
            "<form class=\"jtb-contact-form-form\" method=\"post\" action=\"{}\" data-success-message=\"{}\">",
            escape(&safe_url(&attrs.text_or("form_action", "/forms/contact"))),
            escape(&attrs.text("success_message")),
        ));

        if content.trim().is_empty() {
            html.push_str(&builtin_fields(attrs));
        } else {
            html.push_str(content);
        }

        html.push_str(&format!(
            "<input type=\"text\" name=\"{}\" class=\"jtb-hp\" tabindex=\"-1\" autocomplete=\"off\" aria-hidden=\"true\">",
            HONEYPOT_FIELD
        ));
        html.push_str(&format!(
            "<div class=\"jtb-form-submit\"><button type=\"submit\" class=\"jtb-button jtb-contact-form-button\">{}</button></div>",
            escape(&attrs.text_or("button_text", "Send Message"))
        ));
        html.push_str("<div class=\"jtb-form-message\" role=\"status\" hidden></div>");
        html.push_str("</form></div>");
        html
    }

    fn module_css(&self, _attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let mut hp = Declarations::new();
        hp.push("position", "absolute").push("left", "-9999px");
        css.desktop(&format!("{} .jtb-hp", selector), &hp);

        let mut button = Declarations::new();
        button
            .push("border", "none")
            .push("padding", "12px 28px")
            .push("border-radius", "6px")
            .push("cursor", "pointer");
        css.desktop(&format!("{} .jtb-contact-form-button", selector), &button);
    }
}

fn builtin_fields(attrs: &Attrs) -> String {
    let mut html = String::new();
    let texts: Vec<(&str, String, String, String)> = [
        ("show_name", "name", "name_label", "name_placeholder", "input"),
        ("show_email", "email", "email_label", "email_placeholder", "email"),
        ("show_phone", "phone", "phone_label", "phone_placeholder", "phone"),
        ("show_subject", "subject", "subject_label", "subject_placeholder", "input"),
    ]
    .into_iter()
    .filter(|(toggle, ..)| attrs.bool(toggle))
    .map(|(_, id, label, placeholder, kind)| (id, attrs.text(label), attrs.text(placeholder), kind.to_string()))
    .collect();

    for (id, label, placeholder, kind) in &texts {
        let mut control = FormControl::new(id, label, kind);
        control.required = matches!(*id, "name" | "email");
        control.placeholder = placeholder.as_str();
        html.push_str(&control.render());
    }

    let label = attrs.text_or("message_label", "Message");
    let placeholder = attrs.text("message_placeholder");
    let mut message = FormControl::new("message", &label, "textarea");
    message.required = true;
    message.placeholder = placeholder.as_str();
    message.rows = attrs.number_or("message_rows", 5.0).clamp(1.0, 50.0) as u32;
    message.fullwidth = true;
    html.push_str(&message.render());
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_attrs(value: serde_json::Value) -> Attrs {
        ContactFormField.with_defaults(&Attrs::from_value(value).unwrap())
    }

    #[test]
    fn test_field_text_input_with_required_mark() {
        let html = ContactFormField.render(
            &field_attrs(json!({"field_id": "company", "field_title": "Company", "field_placeholder": "ACME"})),
            "",
        );
        assert_eq!(
            html,
            "<div class=\"jtb-form-field jtb-field-fullwidth\" data-field-id=\"company\">\
             <label class=\"jtb-field-label\" for=\"company\">Company<span class=\"jtb-required\">*</span></label>\
             <input type=\"text\" id=\"company\" name=\"company\" class=\"jtb-field-input\" placeholder=\"ACME\" required></div>"
        );
    }

    #[test]
    fn test_field_select_options() {
        let html = ContactFormField.render(
            &field_attrs(json!({
                "field_id": "topic", "field_title": "Topic", "field_type": "select",
                "required_mark": false, "select_options": "Sales\n\n Support \n"
            })),
            "",
        );
        assert!(html.contains("<option value=\"\">Select...</option><option value=\"Sales\">Sales</option><option value=\"Support\">Support</option>"));
        assert!(!html.contains("required"));
    }

    #[test]
    fn test_field_checkbox_uses_array_name() {
        let html = ContactFormField.render(
            &field_attrs(json!({"field_id": "days", "field_type": "checkbox", "select_options": "Mon\nTue"})),
            "",
        );
        assert!(html.contains("<input type=\"checkbox\" id=\"days_1\" name=\"days[]\" value=\"Tue\">"));
    }

    #[test]
    fn test_field_phone_and_file_types() {
        let phone = ContactFormField.render(&field_attrs(json!({"field_id": "tel", "field_type": "phone"})), "");
        assert!(phone.contains("type=\"tel\""));

        let file = ContactFormField.render(
            &field_attrs(json!({"field_id": "cv", "field_type": "file", "allowed_extensions": "pdf, .docx"})),
            "",
        );
        assert!(file.contains("accept=\".pdf,.docx\""));
    }

    #[test]
    fn test_field_id_derived_from_title() {
        let html = ContactFormField.render(&field_attrs(json!({"field_title": "Your Budget?"})), "");
        assert!(html.contains("name=\"your_budget_\""));
    }

    #[test]
    fn test_field_css_focus_ring() {
        let css = ContactFormField.generate_css(&field_attrs(json!({"input_focus_border": "#ff0000"})), "#f");
        assert!(css.contains("#f .jtb-field-input:focus { outline: none; box-shadow: 0 0 0 3px rgba(255, 0, 0, 0.15); }"));
        assert!(css.contains("#f { margin-bottom: 20px; }"));
    }

    #[test]
    fn test_contact_form_builtin_fields() {
        let attrs = ContactForm.with_defaults(&Attrs::new());
        let html = ContactForm.render(&attrs, "");
        assert!(html.starts_with("<div class=\"jtb-contact-form\"><h3 class=\"jtb-contact-form-title\">Contact Us</h3>"));
        assert!(html.contains("action=\"/forms/contact\""));
        assert!(html.contains("name=\"name\""));
        assert!(html.contains("type=\"email\" id=\"email\""));
        assert!(!html.contains("id=\"phone\""));
        assert!(html.contains("name=\"subject\""));
        assert!(html.contains("rows=\"5\""));
        assert!(html.contains(">Send Message</button>"));
        assert!(html.contains("name=\"website\" class=\"jtb-hp\""));
    }

    #[test]
    fn test_contact_form_children_replace_builtins() {
        let attrs = ContactForm.with_defaults(&Attrs::new());
        let html = ContactForm.render(&attrs, "<div class=\"child\"></div>");
        assert!(html.contains("<div class=\"child\"></div>"));
        assert!(!html.contains("name=\"subject\""));
    }

    #[test]
    fn test_recipient_email_never_rendered() {
        let attrs = ContactForm.with_defaults(
            &Attrs::from_value(json!({"recipient_email": "owner@example.com"})).unwrap(),
        );
        assert!(!ContactForm.render(&attrs, "").contains("owner@example.com"));
    }
}
