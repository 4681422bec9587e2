//! Slug-to-module lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::attrs::Attrs;
use crate::element::{generate_id, wrap, Element};
use crate::fields::schema_json;
use crate::html::class_list;
use crate::modules;

/// Output of rendering a single module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedModule {
    pub id: String,
    pub html: String,
    pub css: String,
}

/// Holds every module the builder knows about, keyed by slug.
#[derive(Clone, Default)]
pub struct Registry {
    elements: BTreeMap<&'static str, Arc<dyn Element>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in modules.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for element in modules::builtin() {
            registry.register(element);
        }
        registry
    }

    /// Adds a module; a later registration with the same slug replaces the earlier one.
    pub fn register(&mut self, element: Arc<dyn Element>) {
        tracing::debug!(slug = element.slug(), "registering module");
        self.elements.insert(element.slug(), element);
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<dyn Element>> {
        self.elements.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.elements.contains_key(slug)
    }

    /// Modules in slug order.
    pub fn list(&self) -> impl Iterator<Item = &Arc<dyn Element>> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Builder palette: every module with its field schemas.
    pub fn describe(&self) -> Vec<Value> {
        self.list()
            .map(|element| {
                json!({
                    "slug": element.slug(),
                    "name": element.name(),
                    "icon": element.icon(),
                    "category": element.category(),
                    "is_child": element.is_child(),
                    "child_slug": element.child_slug(),
                    "fields": {
                        "content": schema_json(&element.fields()),
                        "design": schema_json(&element.design_fields()),
                        "advanced": schema_json(&element.advanced_fields()),
                    },
                })
            })
            .collect()
    }

    /// Renders one module with a generated id.
    pub fn render_module(&self, slug: &str, attrs: &Attrs, content: &str) -> RenderedModule {
        self.render_with_id(slug, &generate_id(slug), attrs, content)
    }

    /// Unknown slugs render as an HTML comment with no CSS. A `css_id`
    /// attribute replaces `id`.
    pub fn render_with_id(&self, slug: &str, id: &str, attrs: &Attrs, content: &str) -> RenderedModule {
        let Some(element) = self.get(slug) else {
            tracing::warn!(slug, "unknown module type");
            return RenderedModule {
                id: id.to_string(),
                html: unknown_module(slug),
                css: String::new(),
            };
        };

        let attrs = element.with_defaults(attrs);
        let id = attrs
            .str("css_id")
            .map(class_list)
            .filter(|custom| !custom.is_empty() && !custom.contains(' '))
            .unwrap_or_else(|| id.to_string());
        let inner = element.render(&attrs, content);
        let html = wrap(element.as_ref(), &attrs, &id, &inner);
        let css = element.generate_css(&attrs, &format!("#{}", id));

        RenderedModule {
            id,
            html,
            css,
        }
    }
}

pub(crate) fn unknown_module(slug: &str) -> String {
    let slug: String = slug
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    format!("<!-- Unknown module type: {} -->", slug)
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.elements.keys().collect::<Vec<_>>())
            .finish()
    }
}
