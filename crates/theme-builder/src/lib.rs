//! Theme builder: declarative page modules rendered to HTML and scoped CSS.
//!
//! A page layout is a tree of sections, rows, columns and modules. Each module
//! is an [`Element`] registered under a slug in the [`Registry`]; it declares a
//! field schema, renders its HTML from an attribute map and emits CSS rules
//! keyed by its DOM selector.

pub mod attrs;
pub mod css;
pub mod element;
pub mod error;
pub mod fields;
pub mod html;
pub mod layout;
pub mod modules;
pub mod registry;
pub mod style_config;
pub mod theme;

pub use attrs::{Attrs, Device};
pub use css::CssBuilder;
pub use element::{wrap, Category, Element, Features};
pub use error::RenderError;
pub use fields::{FieldDef, FieldType, Schema};
pub use layout::{Layout, LayoutRenderer, RenderOutput};
pub use registry::{Registry, RenderedModule};
pub use style_config::StyleRule;
pub use theme::ThemeSettings;
