use serde_json::Value;

use crate::attrs::{Attrs, Device};
use crate::css::{CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{escape, safe_url};
use crate::style_config::StyleRule;

use super::ALIGN_OPTIONS;

/// Trail of links. Intermediate crumbs come from `breadcrumb_items`
/// (`[{label, url}]`), the last crumb is `current_title`. The page renderer
/// injects both; the builder preview shows whatever was saved.
pub struct Breadcrumbs;

const STYLE: &[StyleRule] = &[
    StyleRule::new("link_color", "color", " .jtb-breadcrumb-link").hover(),
    StyleRule::new("current_color", "color", " .jtb-breadcrumb-current"),
    StyleRule::new("separator_color", "color", " .jtb-breadcrumb-separator"),
    StyleRule::new("font_size", "font-size", " .jtb-breadcrumbs").unit("px").responsive(),
];

fn separator(attrs: &Attrs) -> String {
    match attrs.text("separator").as_str() {
        "slash" => "/".to_string(),
        "arrow" => "&rarr;".to_string(),
        "dot" => "&middot;".to_string(),
        "custom" => escape(&attrs.text_or("custom_separator", "/")),
        _ => "&rsaquo;".to_string(),
    }
}

fn crumb(position: usize, label: &str, url: Option<&str>) -> String {
    let body = match url {
        Some(url) => format!(
            "<a class=\"jtb-breadcrumb-link\" href=\"{}\" itemprop=\"item\"><span itemprop=\"name\">{}</span></a>",
            escape(&safe_url(url)),
            escape(label)
        ),
        None => format!(
            "<span class=\"jtb-breadcrumb-current\" aria-current=\"page\" itemprop=\"name\">{}</span>",
            escape(label)
        ),
    };
    format!(
        "<li class=\"jtb-breadcrumb-item\" itemprop=\"itemListElement\" itemscope itemtype=\"https://schema.org/ListItem\">{}<meta itemprop=\"position\" content=\"{}\"></li>",
        body, position
    )
}

impl Element for Breadcrumbs {
    fn slug(&self) -> &'static str {
        "breadcrumbs"
    }

    fn name(&self) -> &'static str {
        "Breadcrumbs"
    }

    fn icon(&self) -> &'static str {
        "chevrons-right"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn fields(&self) -> Schema {
        vec![
            ("show_home", FieldDef::toggle("Show Home Link", true)),
            ("home_label", FieldDef::text("Home Label", "Home").show_if("show_home", &["on", "yes", "true", "1"])),
            ("home_url", FieldDef::url("Home URL", "/")),
            ("current_title", FieldDef::text("Current Page Title", "").blank()),
            (
                "separator",
                FieldDef::select(
                    "Separator",
                    &[
                        ("chevron", "Chevron"),
                        ("slash", "Slash"),
                        ("arrow", "Arrow"),
                        ("dot", "Dot"),
                        ("custom", "Custom"),
                    ],
                    "chevron",
                ),
            ),
            ("custom_separator", FieldDef::text("Custom Separator", "").blank().show_if("separator", &["custom"])),
            ("breadcrumb_alignment", FieldDef::select("Alignment", ALIGN_OPTIONS, "left").responsive()),
            ("link_color", FieldDef::color("Link Color", "").blank().hover()),
            ("current_color", FieldDef::color("Current Page Color", "").blank()),
            ("separator_color", FieldDef::color("Separator Color", "#999999")),
            ("font_size", FieldDef::range("Font Size", 14.0, 10.0, 30.0, "px").blank().responsive()),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let mut crumbs: Vec<(String, Option<String>)> = Vec::new();
        if attrs.bool("show_home") {
            crumbs.push((attrs.text_or("home_label", "Home"), Some(attrs.text_or("home_url", "/"))));
        }
        for item in attrs.list("breadcrumb_items").iter().filter_map(Value::as_object) {
            let Some(label) = item.get("label").and_then(Value::as_str).filter(|l| !l.is_empty()) else {
                continue;
            };
            let url = item
                .get("url")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            crumbs.push((label.to_string(), url));
        }
        if let Some(current) = attrs.str("current_title") {
            crumbs.push((current.to_string(), None));
        }
        if crumbs.is_empty() {
            return String::new();
        }

        let sep = format!(
            "<li class=\"jtb-breadcrumb-separator\" aria-hidden=\"true\">{}</li>",
            separator(attrs)
        );
        let items: Vec<String> = crumbs
            .iter()
            .enumerate()
            .map(|(i, (label, url))| crumb(i + 1, label, url.as_deref()))
            .collect();

        format!(
            "<nav class=\"jtb-breadcrumbs\" aria-label=\"Breadcrumb\"><ol itemscope itemtype=\"https://schema.org/BreadcrumbList\">{}</ol></nav>",
            items.join(&sep)
        )
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let list = format!("{} .jtb-breadcrumbs ol", selector);
        let mut base = Declarations::new();
        base.push("display", "flex")
            .push("flex-wrap", "wrap")
            .push("align-items", "center")
            .push("gap", "8px")
            .push("list-style", "none")
            .push("margin", "0")
            .push("padding", "0");
        css.desktop(&list, &base);

        for device in Device::ALL {
            let Some(align) = attrs.responsive("breadcrumb_alignment", device).and_then(Value::as_str) else {
                continue;
            };
            let mut decls = Declarations::new();
            decls.push(
                "justify-content",
                match align {
                    "center" => "center",
                    "right" => "flex-end",
                    _ => "flex-start",
                },
            );
            css.rule(device, &list, &decls);
        }

        let mut link = Declarations::new();
        link.push("text-decoration", "none");
        css.desktop(&format!("{} .jtb-breadcrumb-link", selector), &link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        Breadcrumbs.with_defaults(&Attrs::from_value(value).unwrap())
    }

    #[test]
    fn test_full_trail() {
        let html = Breadcrumbs.render(
            &attrs(json!({
                "breadcrumb_items": [{"label": "Galleries", "url": "/gallery"}, {"label": ""}],
                "current_title": "Summer <2024>"
            })),
            "",
        );
        assert!(html.starts_with("<nav class=\"jtb-breadcrumbs\" aria-label=\"Breadcrumb\">"));
        assert_eq!(html.matches("class=\"jtb-breadcrumb-item\"").count(), 3);
        assert_eq!(html.matches("jtb-breadcrumb-separator").count(), 2);
        assert!(html.contains("href=\"/\" itemprop=\"item\"><span itemprop=\"name\">Home</span>"));
        assert!(html.contains("href=\"/gallery\""));
        assert!(html.contains("aria-current=\"page\" itemprop=\"name\">Summer &lt;2024&gt;</span>"));
        assert!(html.contains("<meta itemprop=\"position\" content=\"3\">"));
        assert!(html.contains("&rsaquo;"));
    }

    #[test]
    fn test_without_home() {
        let html = Breadcrumbs.render(&attrs(json!({"show_home": false, "current_title": "About"})), "");
        assert!(!html.contains("Home"));
        assert!(!html.contains("jtb-breadcrumb-separator"));
    }

    #[test]
    fn test_custom_separator_escaped() {
        let html = Breadcrumbs.render(
            &attrs(json!({"separator": "custom", "custom_separator": "<b>", "current_title": "X"})),
            "",
        );
        assert!(html.contains(">&lt;b&gt;</li>"));
    }

    #[test]
    fn test_nothing_to_show() {
        assert_eq!(Breadcrumbs.render(&attrs(json!({"show_home": false})), ""), "");
    }

    #[test]
    fn test_css() {
        let css = Breadcrumbs.generate_css(&attrs(json!({"breadcrumb_alignment": "right"})), "#b");
        assert!(css.contains("#b .jtb-breadcrumb-separator { color: #999999; }"));
        assert!(css.contains("#b .jtb-breadcrumbs ol { justify-content: flex-end; }"));
    }
}
