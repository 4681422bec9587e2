//! Theme builder pages (`tb_pages`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
        }
    }
}

impl FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PageStatus::Draft),
            "published" => Ok(PageStatus::Published),
            _ => Err(format!("Unknown page status: {}", s)),
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Layout JSON as edited in the builder.
    pub content: JsonValue,
    /// Rendered stylesheet; `None` after the content changes.
    #[serde(skip_serializing)]
    pub css_cache: Option<String>,
    pub status: PageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

fn title_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Title is required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_optional_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Ok(());
    }
    shared::validation::validate_slug(slug)
}

fn validate_layout(content: &JsonValue) -> Result<(), ValidationError> {
    match content {
        JsonValue::Null | JsonValue::Object(_) => Ok(()),
        _ => {
            let mut err = ValidationError::new("layout_format");
            err.message = Some("Content must be a layout object".into());
            Err(err)
        }
    }
}

/// Create and update share one body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SavePageRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    #[validate(custom(function = "title_not_blank"))]
    pub title: String,

    #[validate(custom(function = "validate_optional_slug"))]
    pub slug: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_layout"))]
    pub content: JsonValue,

    #[serde(default)]
    pub status: PageStatus,
}

impl SavePageRequest {
    pub fn resolved_slug(&self) -> String {
        super::album::resolve_slug(&self.title, self.slug.as_deref())
    }

    /// Content to persist; a missing layout is stored as an empty one.
    pub fn content(&self) -> JsonValue {
        match &self.content {
            JsonValue::Null => serde_json::json!({ "sections": [] }),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(title: &str, content: JsonValue) -> SavePageRequest {
        SavePageRequest {
            title: title.into(),
            slug: None,
            content,
            status: PageStatus::Draft,
        }
    }

    #[test]
    fn test_empty_title_rejected() {
        assert!(request("   ", JsonValue::Null).validate().is_err());
        assert!(request("", JsonValue::Null).validate().is_err());
        assert!(request("About", JsonValue::Null).validate().is_ok());
    }

    #[test]
    fn test_content_must_be_object() {
        assert!(request("About", json!([1, 2])).validate().is_err());
        assert!(request("About", json!({"sections": []})).validate().is_ok());
    }

    #[test]
    fn test_slug_and_content_defaults() {
        let req = request("About Us", JsonValue::Null);
        assert_eq!(req.resolved_slug(), "about-us");
        assert_eq!(req.content(), json!({"sections": []}));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("published".parse::<PageStatus>(), Ok(PageStatus::Published));
        assert!("live".parse::<PageStatus>().is_err());
    }
}
