use serde_json::Value;

use crate::attrs::{Attrs, Device};
use crate::css::{CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{escape, safe_url};
use crate::style_config::StyleRule;

use super::{icon, ALIGN_OPTIONS};

/// Row of social network links read from `social_links`:
/// `[{network, url, label?}]`.
pub struct SocialIcons;

/// Known networks and their brand colors.
pub const NETWORKS: &[(&str, &str, &str)] = &[
    ("facebook", "Facebook", "#3b5998"),
    ("twitter", "X / Twitter", "#000000"),
    ("instagram", "Instagram", "#e1306c"),
    ("linkedin", "LinkedIn", "#0077b5"),
    ("youtube", "YouTube", "#ff0000"),
    ("pinterest", "Pinterest", "#bd081c"),
    ("tiktok", "TikTok", "#010101"),
    ("github", "GitHub", "#333333"),
    ("email", "Email", "#7d7d7d"),
    ("rss", "RSS", "#ff9900"),
];

const STYLE: &[StyleRule] = &[
    StyleRule::new("icon_color", "color", " .jtb-social-link").hover(),
    StyleRule::new("icon_bg_color", "background-color", " .jtb-social-link").hover(),
    StyleRule::new("icon_size", "font-size", " .jtb-social-link").unit("px").responsive(),
];

fn network(slug: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    NETWORKS.iter().find(|(key, _, _)| *key == slug)
}

fn href(network: &str, url: &str) -> String {
    if network == "email" && !url.starts_with("mailto:") && url.contains('@') {
        return format!("mailto:{}", url);
    }
    safe_url(url)
}

impl Element for SocialIcons {
    fn slug(&self) -> &'static str {
        "social_icons"
    }

    fn name(&self) -> &'static str {
        "Social Icons"
    }

    fn icon(&self) -> &'static str {
        "share-2"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn fields(&self) -> Schema {
        vec![
            (
                "icon_shape",
                FieldDef::select(
                    "Shape",
                    &[("circle", "Circle"), ("rounded", "Rounded"), ("square", "Square"), ("plain", "Plain")],
                    "circle",
                ),
            ),
            ("use_brand_colors", FieldDef::toggle("Use Brand Colors", true)),
            ("show_labels", FieldDef::toggle("Show Labels", false)),
            ("open_in_new_tab", FieldDef::toggle("Open in New Tab", true)),
            ("icons_alignment", FieldDef::select("Alignment", ALIGN_OPTIONS, "left").responsive()),
            ("icon_size", FieldDef::range("Icon Size", 18.0, 10.0, 64.0, "px").responsive()),
            ("icon_spacing", FieldDef::range("Spacing", 8.0, 0.0, 40.0, "px")),
            ("icon_color", FieldDef::color("Icon Color", "#ffffff").hover()),
            ("icon_bg_color", FieldDef::color("Icon Background", "").blank().hover()),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let new_tab = attrs.bool("open_in_new_tab");
        let show_labels = attrs.bool("show_labels");
        let shape = match attrs.text("icon_shape").as_str() {
            "rounded" => "rounded",
            "square" => "square",
            "plain" => "plain",
            _ => "circle",
        };

        let mut items = String::new();
        for link in attrs.list("social_links").iter().filter_map(Value::as_object) {
            let slug = link.get("network").and_then(Value::as_str).unwrap_or("");
            let url = link.get("url").and_then(Value::as_str).unwrap_or("").trim();
            let Some((slug, default_label, _)) = network(slug) else {
                continue;
            };
            if url.is_empty() {
                continue;
            }
            let label = link
                .get("label")
                .and_then(Value::as_str)
                .filter(|l| !l.is_empty())
                .unwrap_or(*default_label);

            let target = if new_tab && *slug != "email" {
                " target=\"_blank\" rel=\"noopener noreferrer\""
            } else {
                ""
            };
            let text = if show_labels {
                format!("<span class=\"jtb-social-label\">{}</span>", escape(label))
            } else {
                String::new()
            };
            items.push_str(&format!(
                "<li><a class=\"jtb-social-link jtb-social-{slug}\" href=\"{}\"{target} aria-label=\"{}\">{}{text}</a></li>",
                escape(&href(slug, url)),
                escape(label),
                icon(slug),
            ));
        }

        if items.is_empty() {
            return String::new();
        }
        format!("<ul class=\"jtb-social-icons jtb-social-{}\">{}</ul>", shape, items)
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let list = format!("{} .jtb-social-icons", selector);
        let mut base = Declarations::new();
        base.push("display", "flex")
            .push("flex-wrap", "wrap")
            .push("list-style", "none")
            .push("margin", "0")
            .push("padding", "0")
            .push("gap", format!("{}px", attrs.number_or("icon_spacing", 8.0)));
        css.desktop(&list, &base);

        for device in Device::ALL {
            let Some(align) = attrs.responsive("icons_alignment", device).and_then(Value::as_str) else {
                continue;
            };
            let justify = match align {
                "center" => "center",
                "right" => "flex-end",
                _ => "flex-start",
            };
            let mut decls = Declarations::new();
            decls.push("justify-content", justify);
            css.rule(device, &list, &decls);
        }

        let link = format!("{} .jtb-social-link", selector);
        let mut anchor = Declarations::new();
        anchor
            .push("display", "inline-flex")
            .push("align-items", "center")
            .push("justify-content", "center")
            .push("gap", "6px")
            .push("text-decoration", "none")
            .push("transition", "opacity 0.2s ease");
        let shape = attrs.text("icon_shape");
        if shape != "plain" {
            anchor
                .push("min-width", "2.2em")
                .push("height", "2.2em")
                .push("padding", "0 0.6em");
        }
        match shape.as_str() {
            "circle" => {
                anchor.push("border-radius", "50%");
            }
            "rounded" => {
                anchor.push("border-radius", "6px");
            }
            _ => {}
        }
        css.desktop(&link, &anchor);

        let mut hover = Declarations::new();
        hover.push("opacity", "0.85");
        css.desktop(&format!("{}:hover", link), &hover);

        if attrs.bool("use_brand_colors") && !attrs.has("icon_bg_color") && shape != "plain" {
            for (slug, _, color) in NETWORKS {
                let mut brand = Declarations::new();
                brand.push("background-color", *color);
                css.desktop(&format!("{} .jtb-social-{}", selector, slug), &brand);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        SocialIcons.with_defaults(&Attrs::from_value(value).unwrap())
    }

    fn links() -> serde_json::Value {
        json!([
            {"network": "facebook", "url": "https://facebook.com/example"},
            {"network": "email", "url": "hello@example.com", "label": "Write us"},
            {"network": "myspace", "url": "https://myspace.com/x"},
            {"network": "github", "url": ""},
            {"network": "twitter", "url": "javascript:alert(1)"}
        ])
    }

    #[test]
    fn test_render_known_networks_only() {
        let html = SocialIcons.render(&attrs(json!({"social_links": links()})), "");
        assert!(html.starts_with("<ul class=\"jtb-social-icons jtb-social-circle\">"));
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(!html.contains("myspace"));
        assert!(!html.contains("jtb-social-github"));
        assert!(html.contains(
            "<a class=\"jtb-social-link jtb-social-facebook\" href=\"https://facebook.com/example\" target=\"_blank\" rel=\"noopener noreferrer\" aria-label=\"Facebook\">"
        ));
    }

    #[test]
    fn test_email_gets_mailto_and_no_new_tab() {
        let html = SocialIcons.render(&attrs(json!({"social_links": links(), "show_labels": true})), "");
        assert!(html.contains("href=\"mailto:hello@example.com\" aria-label=\"Write us\""));
        assert!(html.contains("<span class=\"jtb-social-label\">Write us</span>"));
    }

    #[test]
    fn test_unsafe_url_neutralised() {
        let html = SocialIcons.render(&attrs(json!({"social_links": links()})), "");
        assert!(html.contains("jtb-social-twitter\" href=\"#\""));
    }

    #[test]
    fn test_empty_list_renders_nothing() {
        assert_eq!(SocialIcons.render(&attrs(json!({})), ""), "");
    }

    #[test]
    fn test_css_brand_colors_and_alignment() {
        let css = SocialIcons.generate_css(&attrs(json!({"icons_alignment__phone": "center"})), "#s");
        assert!(css.contains("#s .jtb-social-icons { display: flex; flex-wrap: wrap; list-style: none; margin: 0; padding: 0; gap: 8px; }"));
        assert!(css.contains("#s .jtb-social-facebook { background-color: #3b5998; }"));
        assert!(css.contains("#s .jtb-social-link { display: inline-flex;"));
        assert!(css.contains("border-radius: 50%"));
        let phone = css.split("@media (max-width: 767px)").nth(1).unwrap();
        assert!(phone.contains("#s .jtb-social-icons { justify-content: center; }"));
    }

    #[test]
    fn test_custom_background_disables_brand_colors() {
        let css = SocialIcons.generate_css(&attrs(json!({"icon_bg_color": "#111111"})), "#s");
        assert!(!css.contains("#3b5998"));
        assert!(css.contains("#s .jtb-social-link { color: #ffffff; background-color: #111111; }"));
    }
}
