//! Album and album image entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Album, AlbumImage};
use sqlx::FromRow;

/// Row of `albums` joined with its image count.
#[derive(Debug, Clone, FromRow)]
pub struct AlbumEntity {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_template: String,
    pub sort_order: i32,
    pub is_public: bool,
    pub cover_image: Option<String>,
    pub image_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AlbumEntity> for Album {
    fn from(entity: AlbumEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            slug: entity.slug,
            description: entity.description,
            display_template: entity.display_template.parse().unwrap_or_default(),
            sort_order: entity.sort_order,
            is_public: entity.is_public,
            cover_image: entity.cover_image,
            image_count: entity.image_count,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AlbumImageEntity {
    pub id: i64,
    pub album_id: i64,
    pub filename: String,
    pub original_name: String,
    pub title: Option<String>,
    pub mime_type: String,
    pub file_size: i64,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<AlbumImageEntity> for AlbumImage {
    fn from(entity: AlbumImageEntity) -> Self {
        Self {
            id: entity.id,
            album_id: entity.album_id,
            filename: entity.filename,
            original_name: entity.original_name,
            title: entity.title,
            mime_type: entity.mime_type,
            file_size: entity.file_size,
            sort_order: entity.sort_order,
            created_at: entity.created_at,
        }
    }
}
