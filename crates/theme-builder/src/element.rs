use rand::RngCore;
use serde::Serialize;

use crate::attrs::Attrs;
use crate::css::{self, CssBuilder};
use crate::fields::{self, Schema};
use crate::html::{class_list, escape};
use crate::style_config::{self, StyleRule};

/// Which design generators and design-tab fields a module takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Features {
    pub background: bool,
    pub spacing: bool,
    pub border: bool,
    pub box_shadow: bool,
    pub typography: bool,
    pub animation: bool,
    pub transform: bool,
    pub position: bool,
    pub filters: bool,
    pub sizing: bool,
    pub dividers: bool,
}

impl Features {
    pub const fn none() -> Self {
        Self {
            background: false,
            spacing: false,
            border: false,
            box_shadow: false,
            typography: false,
            animation: false,
            transform: false,
            position: false,
            filters: false,
            sizing: false,
            dividers: false,
        }
    }
}

impl Default for Features {
    /// Most modules get the box-model generators but no typography or dividers.
    fn default() -> Self {
        Self {
            background: true,
            spacing: true,
            border: true,
            box_shadow: true,
            animation: true,
            transform: true,
            filters: true,
            sizing: true,
            ..Self::none()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structure,
    Content,
    Media,
    Forms,
    Navigation,
}

/// A page-builder module.
pub trait Element: Send + Sync {
    fn slug(&self) -> &'static str;
    fn name(&self) -> &'static str;

    fn icon(&self) -> &'static str {
        "square"
    }

    fn category(&self) -> Category {
        Category::Content
    }

    /// Child modules only render inside their parent.
    fn is_child(&self) -> bool {
        false
    }

    fn child_slug(&self) -> Option<&'static str> {
        None
    }

    fn features(&self) -> Features {
        Features::default()
    }

    /// Content-tab fields.
    fn fields(&self) -> Schema;

    fn design_fields(&self) -> Schema {
        fields::design_fields(&self.features())
    }

    fn advanced_fields(&self) -> Schema {
        fields::advanced_fields()
    }

    fn style_config(&self) -> &'static [StyleRule] {
        &[]
    }

    /// Inner HTML; `content` is the already rendered children.
    fn render(&self, attrs: &Attrs, content: &str) -> String;

    /// Module-specific rules, emitted before the shared design rules.
    fn module_css(&self, _attrs: &Attrs, _selector: &str, _css: &mut CssBuilder) {}

    fn generate_css(&self, attrs: &Attrs, selector: &str) -> String {
        let mut css = CssBuilder::new();
        style_config::apply(self.style_config(), attrs, selector, &mut css);
        self.module_css(attrs, selector, &mut css);
        css::common(&self.features(), attrs, selector, &mut css);
        css.finish()
    }

    /// Attributes with every schema default filled in.
    fn with_defaults(&self, attrs: &Attrs) -> Attrs {
        let mut merged = attrs.clone();
        merged.merge_defaults(&self.fields());
        merged.merge_defaults(&self.design_fields());
        merged.merge_defaults(&self.advanced_fields());
        merged
    }
}

/// `{slug}_{8 hex}`, used when a module is rendered outside a layout.
pub fn generate_id(slug: &str) -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}_{}", slug, hex::encode(bytes))
}

/// Wraps module output in its outer `div` with id, classes and animation data.
pub fn wrap(element: &dyn Element, attrs: &Attrs, id: &str, inner: &str) -> String {
    let mut classes = vec![
        "jtb-module".to_string(),
        format!("jtb-module-{}", element.slug()),
    ];

    if let Some(extra) = attrs.str("css_class") {
        let extra = class_list(extra);
        if !extra.is_empty() {
            classes.push(extra);
        }
    }
    for (key, class) in [
        ("disable_on_desktop", "jtb-hide-desktop"),
        ("disable_on_tablet", "jtb-hide-tablet"),
        ("disable_on_phone", "jtb-hide-phone"),
    ] {
        if attrs.bool(key) {
            classes.push(class.to_string());
        }
    }

    let animation = attrs.text_or("animation_style", "none");
    let mut data = String::new();
    if animation != "none" {
        let animation = class_list(&animation);
        classes.push("jtb-animated".to_string());
        classes.push(format!("jtb-animation-{}", animation));
        data.push_str(&format!(
            " data-animation-duration=\"{}\" data-animation-delay=\"{}\"",
            attrs.number_or("animation_duration", 1000.0),
            attrs.number_or("animation_delay", 0.0)
        ));
    }

    format!(
        "<div id=\"{}\" class=\"{}\"{}>{}</div>",
        escape(id),
        classes.join(" "),
        data,
        inner
    )
}
