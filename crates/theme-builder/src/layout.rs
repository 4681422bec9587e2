//! Page layout tree and its renderer.
//!
//! A layout is `sections[] -> rows[] -> columns[] -> modules[]`. Structure
//! nodes carry a `settings` map; modules carry `content`, `design` and
//! `advanced` maps which are merged (later maps win) before rendering.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::{Attrs, Device};
use crate::css::{self, clean, CssBuilder, Declarations};
use crate::element::Features;
use crate::error::RenderError;
use crate::html::{class_list, escape};
use crate::registry::{unknown_module, Registry};

pub const SECTION_MAX_WIDTH: &str = "1200px";
pub const ROW_GAP: &str = "24px";

/// Half of the default row gap, subtracted from every column basis.
const COLUMN_GUTTER: &str = "12px";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub settings: Attrs,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub settings: Attrs,
    #[serde(default)]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub settings: Attrs,
    #[serde(default)]
    pub modules: Vec<ModuleNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: Attrs,
    #[serde(default)]
    pub design: Attrs,
    #[serde(default)]
    pub advanced: Attrs,
    /// Child modules, e.g. the fields of a contact form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModuleNode>,
}

impl Layout {
    pub fn from_value(value: Value) -> Result<Self, RenderError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Every module in document order, children included.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        fn walk<'a>(node: &'a ModuleNode, out: &mut Vec<&'a ModuleNode>) {
            out.push(node);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for section in &self.sections {
            for row in &section.rows {
                for column in &row.columns {
                    for module in &column.modules {
                        walk(module, &mut out);
                    }
                }
            }
        }
        out.into_iter()
    }
}

impl ModuleNode {
    /// Slug without the legacy `jtb_` prefix.
    pub fn slug(&self) -> &str {
        self.kind.strip_prefix("jtb_").unwrap_or(&self.kind)
    }

    /// Content, design and advanced maps merged into one attribute set.
    pub fn attrs(&self) -> Attrs {
        let mut merged = Attrs::new();
        for part in [&self.content, &self.design, &self.advanced] {
            if let Value::Object(map) = part.clone().into_value() {
                for (key, value) in map {
                    merged.set(&key, value);
                }
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub html: String,
    pub css: String,
}

/// Widths for a named column layout. Unknown names, and names whose column
/// count differs from `count`, split evenly.
pub fn column_widths(layout: &str, count: usize) -> Vec<String> {
    let named: &[&str] = match layout {
        "1" => &["100%"],
        "2" => &["50%", "50%"],
        "3" => &["33.333%", "33.333%", "33.333%"],
        "4" => &["25%", "25%", "25%", "25%"],
        "1_2" => &["33.333%", "66.666%"],
        "2_1" => &["66.666%", "33.333%"],
        "1_3" => &["25%", "75%"],
        "3_1" => &["75%", "25%"],
        "1_1_2" => &["25%", "25%", "50%"],
        "2_1_1" => &["50%", "25%", "25%"],
        "1_2_1" => &["25%", "50%", "25%"],
        _ => &[],
    };
    if !named.is_empty() && named.len() == count {
        return named.iter().map(|w| (*w).to_string()).collect();
    }

    let width = 100.0 / count.max(1) as f64;
    let text = format!("{:.3}", width);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    vec![format!("{}%", text); count]
}

fn section_features() -> Features {
    Features {
        background: true,
        spacing: true,
        border: true,
        box_shadow: true,
        dividers: true,
        ..Features::none()
    }
}

fn row_features() -> Features {
    Features {
        background: true,
        spacing: true,
        border: true,
        box_shadow: true,
        ..Features::none()
    }
}

/// Renders a [`Layout`] against a [`Registry`].
///
/// Ids are `jtb_{kind}_{n}` with one counter shared by every node of a
/// render, so output is stable for identical input.
pub struct LayoutRenderer<'a> {
    registry: &'a Registry,
    counter: usize,
    css: Vec<String>,
}

impl<'a> LayoutRenderer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            counter: 0,
            css: Vec::new(),
        }
    }

    pub fn render(mut self, layout: &Layout) -> RenderOutput {
        let mut html = String::new();
        for section in &layout.sections {
            html.push_str(&self.render_section(section));
        }
        let css = self.stylesheet();
        tracing::debug!(
            sections = layout.sections.len(),
            html_bytes = html.len(),
            css_bytes = css.len(),
            "layout rendered"
        );
        RenderOutput { html, css }
    }

    fn next_id(&mut self, kind: &str) -> String {
        self.counter += 1;
        format!("jtb_{}_{}", kind, self.counter)
    }

    fn collect(&mut self, css: String) {
        if !css.is_empty() {
            self.css.push(css);
        }
    }

    /// Element id: a user supplied `css_id` wins over the generated one.
    fn dom_id(settings: &Attrs, generated: &str) -> String {
        settings
            .str("css_id")
            .map(class_list)
            .filter(|id| !id.is_empty() && !id.contains(' '))
            .unwrap_or_else(|| generated.to_string())
    }

    fn classes(base: &str, settings: &Attrs) -> String {
        let mut classes = base.to_string();
        if let Some(extra) = settings.str("css_class") {
            let extra = class_list(extra);
            if !extra.is_empty() {
                classes.push(' ');
                classes.push_str(&extra);
            }
        }
        for (key, class) in [
            ("disable_on_desktop", "jtb-hide-desktop"),
            ("disable_on_tablet", "jtb-hide-tablet"),
            ("disable_on_phone", "jtb-hide-phone"),
        ] {
            if settings.bool(key) {
                classes.push(' ');
                classes.push_str(class);
            }
        }
        classes
    }

    fn render_section(&mut self, section: &Section) -> String {
        let generated = self.next_id("section");
        let settings = &section.settings;
        let id = Self::dom_id(settings, &generated);
        let selector = format!("#{}", id);

        let mut builder = CssBuilder::new();
        let fullwidth = settings.bool("fullwidth");
        let mut inner = Declarations::new();
        if fullwidth {
            inner.push("width", "100%");
        } else {
            let max_width = settings
                .str("max_width")
                .map(clean)
                .filter(|w| !w.is_empty())
                .unwrap_or_else(|| SECTION_MAX_WIDTH.to_string());
            inner.push("max-width", max_width).push("margin", "0 auto");
        }
        builder.desktop(&format!("{} > .jtb-section-inner", selector), &inner);
        if let Some(min_height) = settings.str("min_height") {
            let mut decls = Declarations::new();
            decls.push("min-height", clean(min_height));
            builder.desktop(&selector, &decls);
        }
        css::common(&section_features(), settings, &selector, &mut builder);
        self.collect(builder.finish());

        let rows: String = section.rows.iter().map(|row| self.render_row(row)).collect();
        let base = if fullwidth {
            "jtb-section jtb-section-fullwidth"
        } else {
            "jtb-section"
        };

        format!(
            "<section id=\"{}\" class=\"{}\"><div class=\"jtb-section-inner\">{}</div></section>",
            escape(&id),
            Self::classes(base, settings),
            rows
        )
    }

    fn render_row(&mut self, row: &Row) -> String {
        let generated = self.next_id("row");
        let settings = &row.settings;
        let id = Self::dom_id(settings, &generated);
        let selector = format!("#{}", id);

        let mut decls = Declarations::new();
        decls
            .push("display", "flex")
            .push("flex-wrap", if settings.has("wrap") && !settings.bool("wrap") { "nowrap" } else { "wrap" })
            .push("gap", settings.str("gap").map(clean).unwrap_or_else(|| ROW_GAP.to_string()))
            .push("align-items", settings.str("align_items").map(clean).unwrap_or_else(|| "stretch".into()))
            .push(
                "justify-content",
                settings.str("justify_content").map(clean).unwrap_or_else(|| "flex-start".into()),
            );
        let mut builder = CssBuilder::new();
        builder.desktop(&selector, &decls);
        css::common(&row_features(), settings, &selector, &mut builder);
        self.collect(builder.finish());

        let layout = settings.text_or("columns", &row.columns.len().max(1).to_string());
        let widths = column_widths(&layout, row.columns.len());
        let columns: String = row
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let width = widths.get(i).map(String::as_str).unwrap_or("auto");
                self.render_column(column, width)
            })
            .collect();

        format!(
            "<div id=\"{}\" class=\"{}\">{}</div>",
            escape(&id),
            Self::classes(&format!("jtb-row jtb-row-{}", class_list(&layout)), settings),
            columns
        )
    }

    fn render_column(&mut self, column: &Column, width: &str) -> String {
        let generated = self.next_id("column");
        let settings = &column.settings;
        let id = Self::dom_id(settings, &generated);
        let selector = format!("#{}", id);

        let width = settings.str("width").map(clean).unwrap_or_else(|| width.to_string());
        let mut decls = Declarations::new();
        decls.push("display", "flex").push("flex-direction", "column");
        if width.is_empty() || width == "auto" {
            decls.push("flex", "1");
        } else {
            decls.push("flex", format!("0 0 calc({} - {})", width, COLUMN_GUTTER));
        }
        decls
            .push(
                "justify-content",
                settings.str("vertical_align").map(clean).unwrap_or_else(|| "flex-start".into()),
            )
            .push("text-align", settings.str("text_align").map(clean).unwrap_or_else(|| "left".into()));

        let mut builder = CssBuilder::new();
        builder.desktop(&selector, &decls);
        css::common(&row_features(), settings, &selector, &mut builder);
        self.collect(builder.finish());

        let modules: String = column.modules.iter().map(|m| self.render_module(m)).collect();
        format!(
            "<div id=\"{}\" class=\"{}\">{}</div>",
            escape(&id),
            Self::classes("jtb-column", settings),
            modules
        )
    }

    fn render_module(&mut self, node: &ModuleNode) -> String {
        let slug = node.slug().to_string();
        if slug.is_empty() {
            return String::new();
        }
        if !self.registry.contains(&slug) {
            tracing::warn!(slug = %slug, "layout references unknown module type");
            return unknown_module(&slug);
        }

        let generated = self.next_id("module");
        let children: String = node.children.iter().map(|child| self.render_module(child)).collect();
        let attrs = node.attrs();
        let rendered = self.registry.render_with_id(&slug, &generated, &attrs, &children);
        self.collect(rendered.css);
        rendered.html
    }

    fn stylesheet(&self) -> String {
        if self.css.is_empty() {
            return String::new();
        }
        let mut out = String::from(
            ".jtb-section { position: relative; }\n\
             .jtb-row { width: 100%; }\n\
             .jtb-column { box-sizing: border-box; }\n\
             .jtb-module { position: relative; }\n",
        );
        for block in &self.css {
            out.push_str(block);
        }
        if let Some(query) = Device::Phone.media_query() {
            out.push_str(query);
            out.push_str(" {\n  .jtb-row { flex-direction: column; }\n  .jtb-column { flex: 0 0 100% !important; }\n}\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: Value) -> RenderOutput {
        let registry = Registry::builtin();
        let layout = Layout::from_value(value).unwrap();
        LayoutRenderer::new(&registry).render(&layout)
    }

    #[test]
    fn test_column_widths() {
        assert_eq!(column_widths("1_2", 2), vec!["33.333%", "66.666%"]);
        assert_eq!(column_widths("1_2_1", 3), vec!["25%", "50%", "25%"]);
        assert_eq!(column_widths("5", 5), vec!["20%"; 5]);
        assert_eq!(column_widths("custom", 3), vec!["33.333%"; 3]);
        assert_eq!(column_widths("weird", 0), Vec::<String>::new());
        assert_eq!(column_widths("1", 2), vec!["50%"; 2]);
        assert_eq!(column_widths("1_2", 3), vec!["33.333%"; 3]);
        assert_eq!(column_widths("4", 2), vec!["50%"; 2]);
    }

    #[test]
    fn test_row_without_columns_setting_splits_evenly() {
        let out = render(json!({
            "sections": [{"rows": [{"columns": [{"modules": []}, {"modules": []}]}]}]
        }));

        assert!(out.html.contains("class=\"jtb-row jtb-row-2\""));
        assert!(out.css.contains("#jtb_column_3 { display: flex; flex-direction: column; flex: 0 0 calc(50% - 12px);"));
        assert!(out.css.contains("#jtb_column_4 { display: flex; flex-direction: column; flex: 0 0 calc(50% - 12px);"));
        assert!(!out.css.contains("calc(100% - 12px)"));
    }

    #[test]
    fn test_named_layout_with_wrong_column_count_splits_evenly() {
        let out = render(json!({
            "sections": [{"rows": [{
                "settings": {"columns": "1_2"},
                "columns": [{"modules": []}, {"modules": []}, {"modules": []}]
            }]}]
        }));

        for id in ["jtb_column_3", "jtb_column_4", "jtb_column_5"] {
            assert!(out.css.contains(&format!("#{} {{ display: flex; flex-direction: column; flex: 0 0 calc(33.333% - 12px);", id)));
        }
    }

    #[test]
    fn test_empty_layout() {
        let out = render(json!({}));
        assert_eq!(out, RenderOutput::default());
        assert_eq!(Layout::from_json("  ").unwrap(), Layout::default());
    }

    #[test]
    fn test_invalid_layout() {
        assert!(matches!(Layout::from_json("{\"sections\": 3}"), Err(RenderError::InvalidLayout(_))));
    }

    #[test]
    fn test_render_tree_ids_and_structure() {
        let out = render(json!({
            "sections": [{
                "rows": [{
                    "settings": {"columns": "1_2"},
                    "columns": [
                        {"modules": [{"type": "button", "content": {"text": "Go"}}]},
                        {"modules": [{"type": "jtb_search"}]}
                    ]
                }]
            }]
        }));

        assert!(out.html.starts_with("<section id=\"jtb_section_1\" class=\"jtb-section\"><div class=\"jtb-section-inner\"><div id=\"jtb_row_2\" class=\"jtb-row jtb-row-1_2\"><div id=\"jtb_column_3\" class=\"jtb-column\"><div id=\"jtb_module_4\" class=\"jtb-module jtb-module-button\">"));
        assert!(out.html.contains("id=\"jtb_column_5\""));
        assert!(out.html.contains("id=\"jtb_module_6\" class=\"jtb-module jtb-module-search\""));

        assert!(out.css.starts_with(".jtb-section { position: relative; }\n"));
        assert!(out.css.contains("#jtb_section_1 > .jtb-section-inner { max-width: 1200px; margin: 0 auto; }"));
        assert!(out.css.contains("#jtb_row_2 { display: flex; flex-wrap: wrap; gap: 24px; align-items: stretch; justify-content: flex-start; }"));
        assert!(out.css.contains("#jtb_column_3 { display: flex; flex-direction: column; flex: 0 0 calc(33.333% - 12px);"));
        assert!(out.css.contains("flex: 0 0 calc(66.666% - 12px)"));
        assert!(out.css.contains("#jtb_module_4 .jtb-button"));
        assert!(out.css.ends_with("@media (max-width: 767px) {\n  .jtb-row { flex-direction: column; }\n  .jtb-column { flex: 0 0 100% !important; }\n}\n"));
    }

    #[test]
    fn test_fullwidth_section_and_css_id() {
        let out = render(json!({
            "sections": [{"settings": {"fullwidth": true, "css_id": "hero", "css_class": "dark", "background_color": "#000000"}}]
        }));
        assert_eq!(
            out.html,
            "<section id=\"hero\" class=\"jtb-section jtb-section-fullwidth dark\"><div class=\"jtb-section-inner\"></div></section>"
        );
        assert!(out.css.contains("#hero > .jtb-section-inner { width: 100%; }"));
        assert!(out.css.contains("#hero { background-color: #000000; }"));
    }

    #[test]
    fn test_unknown_module_in_layout() {
        let out = render(json!({
            "sections": [{"rows": [{"columns": [{"modules": [{"type": "marquee"}, {"type": ""}]}]}]}]
        }));
        assert!(out.html.contains("<!-- Unknown module type: marquee -->"));
        assert!(!out.html.contains("jtb_module_"));
    }

    #[test]
    fn test_children_rendered_into_parent() {
        let out = render(json!({
            "sections": [{"rows": [{"columns": [{"modules": [{
                "type": "contact_form",
                "children": [
                    {"type": "contact_form_field", "content": {"field_id": "topic", "field_title": "Topic"}}
                ]
            }]}]}]}]
        }));
        assert!(out.html.contains("jtb-module-contact_form_field"));
        assert!(out.html.contains("name=\"topic\""));
    }

    #[test]
    fn test_module_attrs_merge_order() {
        let node: ModuleNode = serde_json::from_value(json!({
            "type": "button",
            "content": {"text": "A", "css_class": "x"},
            "advanced": {"css_class": "y"}
        }))
        .unwrap();
        let attrs = node.attrs();
        assert_eq!(attrs.text("text"), "A");
        assert_eq!(attrs.text("css_class"), "y");
    }

    #[test]
    fn test_modules_iterator() {
        let layout = Layout::from_value(json!({
            "sections": [{"rows": [{"columns": [{"modules": [
                {"type": "contact_form", "children": [{"type": "contact_form_field"}]},
                {"type": "button"}
            ]}]}]}]
        }))
        .unwrap();
        let kinds: Vec<&str> = layout.modules().map(|m| m.slug()).collect();
        assert_eq!(kinds, vec!["contact_form", "contact_form_field", "button"]);
    }
}
