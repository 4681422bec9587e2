//! Built-in modules.

use std::sync::Arc;

use crate::element::Element;
use crate::html::class_list;

pub mod breadcrumbs;
pub mod button;
pub mod contact_form;
pub mod gallery;
pub mod login;
pub mod search;
pub mod signup;
pub mod social_icons;

pub use breadcrumbs::Breadcrumbs;
pub use button::Button;
pub use contact_form::{ContactForm, ContactFormField};
pub use gallery::Gallery;
pub use login::Login;
pub use search::Search;
pub use signup::Signup;
pub use social_icons::SocialIcons;

pub fn builtin() -> Vec<Arc<dyn Element>> {
    vec![
        Arc::new(Button),
        Arc::new(ContactForm),
        Arc::new(ContactFormField),
        Arc::new(Signup),
        Arc::new(Search),
        Arc::new(Login),
        Arc::new(Gallery),
        Arc::new(SocialIcons),
        Arc::new(Breadcrumbs),
    ]
}

/// Icon placeholder rendered by the front-end icon font.
pub(crate) fn icon(name: &str) -> String {
    let name = class_list(name);
    if name.is_empty() {
        String::new()
    } else {
        format!("<span class=\"jtb-icon jtb-icon-{}\" aria-hidden=\"true\"></span>", name)
    }
}

pub(crate) const ALIGN_OPTIONS: &[(&str, &str)] = &[
    ("left", "Left"),
    ("center", "Center"),
    ("right", "Right"),
];
