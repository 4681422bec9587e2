//! Gallery albums and their images.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// How the public gallery page lays out an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTemplate {
    #[default]
    Grid,
    Masonry,
    Carousel,
    List,
}

impl DisplayTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayTemplate::Grid => "grid",
            DisplayTemplate::Masonry => "masonry",
            DisplayTemplate::Carousel => "carousel",
            DisplayTemplate::List => "list",
        }
    }
}

impl FromStr for DisplayTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(DisplayTemplate::Grid),
            "masonry" => Ok(DisplayTemplate::Masonry),
            "carousel" => Ok(DisplayTemplate::Carousel),
            "list" => Ok(DisplayTemplate::List),
            _ => Err(format!("Unknown display template: {}", s)),
        }
    }
}

impl fmt::Display for DisplayTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_template: DisplayTemplate,
    pub sort_order: i32,
    pub is_public: bool,
    pub cover_image: Option<String>,
    pub image_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumImage {
    pub id: i64,
    pub album_id: i64,
    /// Stored file name inside the album's upload directory.
    pub filename: String,
    pub original_name: String,
    pub title: Option<String>,
    pub mime_type: String,
    pub file_size: i64,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl AlbumImage {
    /// Public URL under the given uploads prefix.
    pub fn url(&self, public_prefix: &str) -> String {
        format!(
            "{}/galleries/{}/{}",
            public_prefix.trim_end_matches('/'),
            self.album_id,
            self.filename
        )
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Name is required".into());
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlbumRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub name: String,

    /// Derived from the name when missing or empty.
    #[validate(custom(function = "validate_optional_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub display_template: DisplayTemplate,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_true")]
    pub is_public: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAlbumRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub name: String,

    #[validate(custom(function = "validate_optional_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub display_template: DisplayTemplate,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

/// Slug to store: the requested one, or one derived from `name`.
pub fn resolve_slug(name: &str, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => shared::slug::slugify(name),
    }
}

impl CreateAlbumRequest {
    pub fn resolved_slug(&self) -> String {
        resolve_slug(&self.name, self.slug.as_deref())
    }

    pub fn description(&self) -> Option<String> {
        trimmed(self.description.as_deref())
    }
}

impl UpdateAlbumRequest {
    pub fn resolved_slug(&self) -> String {
        resolve_slug(&self.name, self.slug.as_deref())
    }

    pub fn description(&self) -> Option<String> {
        trimmed(self.description.as_deref())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateImageTitleRequest {
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
}

fn validate_order(order: &[i64]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(order.len());
    if order.iter().all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("duplicate_ids");
        err.message = Some("Image order contains duplicate ids".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReorderImagesRequest {
    #[validate(length(min = 1, message = "Order must not be empty"))]
    #[validate(custom(function = "validate_order"))]
    pub order: Vec<i64>,
}

/// Album plus its images, as returned by the edit and public pages.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumWithImages {
    #[serde(flatten)]
    pub album: Album,
    pub images: Vec<AlbumImageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumImageView {
    #[serde(flatten)]
    pub image: AlbumImage,
    pub url: String,
}

impl AlbumImageView {
    pub fn new(image: AlbumImage, public_prefix: &str) -> Self {
        let url = image.url(public_prefix);
        Self { image, url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, slug: Option<&str>) -> CreateAlbumRequest {
        CreateAlbumRequest {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            description: None,
            display_template: DisplayTemplate::Grid,
            sort_order: 0,
            is_public: true,
        }
    }

    #[test]
    fn test_display_template_round_trip() {
        assert_eq!(DisplayTemplate::from_str("Masonry").unwrap(), DisplayTemplate::Masonry);
        assert_eq!(DisplayTemplate::Carousel.to_string(), "carousel");
        assert!(DisplayTemplate::from_str("slider").is_err());
        assert_eq!(DisplayTemplate::default(), DisplayTemplate::Grid);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(create("", None).validate().is_err());
        let errors = create("   ", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_bad_slug_rejected() {
        assert!(create("Trip", Some("Not A Slug")).validate().is_err());
        assert!(create("Trip", Some("trip-2024")).validate().is_ok());
        assert!(create("Trip", Some("")).validate().is_ok());
    }

    #[test]
    fn test_slug_derived_from_name() {
        assert_eq!(create("Summer Trip 2024", None).resolved_slug(), "summer-trip-2024");
        assert_eq!(create("Summer", Some(" ")).resolved_slug(), "summer");
        assert_eq!(create("Summer", Some("beach")).resolved_slug(), "beach");
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateAlbumRequest = serde_json::from_str(r#"{"name": "Trip"}"#).unwrap();
        assert!(req.is_public);
        assert_eq!(req.display_template, DisplayTemplate::Grid);
        assert_eq!(req.description(), None);
    }

    #[test]
    fn test_reorder_validation() {
        assert!(ReorderImagesRequest { order: vec![3, 1, 2] }.validate().is_ok());
        assert!(ReorderImagesRequest { order: vec![] }.validate().is_err());
        assert!(ReorderImagesRequest { order: vec![1, 1] }.validate().is_err());
    }

    #[test]
    fn test_image_title_length() {
        let long = UpdateImageTitleRequest { title: Some("x".repeat(256)) };
        assert!(long.validate().is_err());
        assert!(UpdateImageTitleRequest { title: None }.validate().is_ok());
    }

    #[test]
    fn test_image_url() {
        let image = AlbumImage {
            id: 1,
            album_id: 7,
            filename: "abc.jpg".into(),
            original_name: "beach.jpg".into(),
            title: None,
            mime_type: "image/jpeg".into(),
            file_size: 10,
            sort_order: 0,
            created_at: Utc::now(),
        };
        assert_eq!(image.url("/uploads/"), "/uploads/galleries/7/abc.jpg");
    }
}
