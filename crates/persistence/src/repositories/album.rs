//! Album repository: galleries and their images.

use domain::models::album::{CreateAlbumRequest, UpdateAlbumRequest};
use domain::models::{Album, AlbumImage};
use shared::pagination::{PageRequest, Paginated};
use sqlx::PgPool;

use crate::entities::{AlbumEntity, AlbumImageEntity};
use crate::metrics::QueryTimer;

const ALBUM_COLUMNS: &str = r#"
    a.id, a.name, a.slug, a.description, a.display_template, a.sort_order, a.is_public,
    a.cover_image, a.created_at, a.updated_at,
    (SELECT COUNT(*) FROM album_images i WHERE i.album_id = a.id) AS image_count
"#;

const IMAGE_COLUMNS: &str =
    "id, album_id, filename, original_name, title, mime_type, file_size, sort_order, created_at";

/// Album fields written on create and update.
#[derive(Debug, Clone)]
pub struct AlbumInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_template: String,
    pub sort_order: i32,
    pub is_public: bool,
}

impl From<&CreateAlbumRequest> for AlbumInput {
    fn from(req: &CreateAlbumRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            slug: req.resolved_slug(),
            description: req.description(),
            display_template: req.display_template.as_str().to_string(),
            sort_order: req.sort_order,
            is_public: req.is_public,
        }
    }
}

impl From<&UpdateAlbumRequest> for AlbumInput {
    fn from(req: &UpdateAlbumRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            slug: req.resolved_slug(),
            description: req.description(),
            display_template: req.display_template.as_str().to_string(),
            sort_order: req.sort_order,
            is_public: req.is_public,
        }
    }
}

/// Image metadata recorded after the file is stored.
#[derive(Debug, Clone)]
pub struct NewAlbumImage {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
}

#[derive(Clone)]
pub struct AlbumRepository {
    pool: PgPool,
}

impl AlbumRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<Album>, sqlx::Error> {
        let timer = QueryTimer::new("list_albums");
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;
        let query = format!(
            "SELECT {} FROM albums a ORDER BY a.sort_order, a.created_at DESC LIMIT $1 OFFSET $2",
            ALBUM_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlbumEntity>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();
        Ok(Paginated::new(
            rows.into_iter().map(Into::into).collect(),
            total,
            page,
        ))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Album>, sqlx::Error> {
        let query = format!("SELECT {} FROM albums a WHERE a.id = $1", ALBUM_COLUMNS);
        let row = sqlx::query_as::<_, AlbumEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Public albums only.
    pub async fn find_public_by_slug(&self, slug: &str) -> Result<Option<Album>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM albums a WHERE a.slug = $1 AND a.is_public",
            ALBUM_COLUMNS
        );
        let row = sqlx::query_as::<_, AlbumEntity>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Public albums whose name or description contains `q`, case-insensitively.
    /// `q` is plain text; `%` and `_` match only themselves.
    pub async fn search_public(&self, q: &str, limit: i64) -> Result<Vec<Album>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {} FROM albums a
            WHERE a.is_public
              AND (strpos(lower(a.name), lower($1)) > 0 OR strpos(lower(a.description), lower($1)) > 0)
            ORDER BY a.sort_order, a.name
            LIMIT $2
            "#,
            ALBUM_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlbumEntity>(&query)
            .bind(q)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether another album already uses `slug`.
    pub async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM albums WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn create(&self, input: &AlbumInput) -> Result<Album, sqlx::Error> {
        let timer = QueryTimer::new("create_album");
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO albums (name, slug, description, display_template, sort_order, is_public)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(&input.display_template)
        .bind(input.sort_order)
        .bind(input.is_public)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(&self, id: i64, input: &AlbumInput) -> Result<Album, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE albums
            SET name = $2, slug = $3, description = $4, display_template = $5,
                sort_order = $6, is_public = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(&input.display_template)
        .bind(input.sort_order)
        .bind(input.is_public)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Deletes the album and its image rows in one transaction.
    ///
    /// Returns the stored file names so the caller can remove the files.
    pub async fn delete(&self, id: i64) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("delete_album");
        let mut tx = self.pool.begin().await?;

        let filenames: Vec<String> = sqlx::query_scalar(
            "SELECT filename FROM album_images WHERE album_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM album_images WHERE album_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            // dropping the transaction rolls it back
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        timer.record();
        Ok(filenames)
    }

    pub async fn images(&self, album_id: i64) -> Result<Vec<AlbumImage>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM album_images WHERE album_id = $1 ORDER BY sort_order, id",
            IMAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlbumImageEntity>(&query)
            .bind(album_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_image(&self, album_id: i64, image_id: i64) -> Result<Option<AlbumImage>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM album_images WHERE album_id = $1 AND id = $2",
            IMAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, AlbumImageEntity>(&query)
            .bind(album_id)
            .bind(image_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Appends uploaded images and sets the cover when the album has none.
    pub async fn add_images(&self, album_id: i64, images: &[NewAlbumImage]) -> Result<Vec<AlbumImage>, sqlx::Error> {
        let timer = QueryTimer::new("add_album_images");
        let mut tx = self.pool.begin().await?;

        let mut next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM album_images WHERE album_id = $1",
        )
        .bind(album_id)
        .fetch_one(&mut *tx)
        .await?;

        let insert = format!(
            r#"
            INSERT INTO album_images (album_id, filename, original_name, mime_type, file_size, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        );
        let mut stored = Vec::with_capacity(images.len());
        for image in images {
            let row = sqlx::query_as::<_, AlbumImageEntity>(&insert)
                .bind(album_id)
                .bind(&image.filename)
                .bind(&image.original_name)
                .bind(&image.mime_type)
                .bind(image.file_size)
                .bind(next_order)
                .fetch_one(&mut *tx)
                .await?;
            next_order += 1;
            stored.push(AlbumImage::from(row));
        }

        if let Some(first) = stored.first() {
            sqlx::query(
                "UPDATE albums SET cover_image = COALESCE(cover_image, $2), updated_at = NOW() WHERE id = $1",
            )
            .bind(album_id)
            .bind(&first.filename)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(stored)
    }

    pub async fn update_image_title(
        &self,
        album_id: i64,
        image_id: i64,
        title: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE album_images SET title = $3 WHERE album_id = $1 AND id = $2")
            .bind(album_id)
            .bind(image_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrites `sort_order` to the position of each id in `order`.
    ///
    /// Fails with `RowNotFound` when an id does not belong to the album.
    pub async fn reorder(&self, album_id: i64, order: &[i64]) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("reorder_album_images");
        let mut tx = self.pool.begin().await?;
        for (position, image_id) in order.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE album_images SET sort_order = $3 WHERE album_id = $1 AND id = $2",
            )
            .bind(album_id)
            .bind(image_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
        }
        tx.commit().await?;
        timer.record();
        Ok(())
    }

    /// Deletes one image row, moving the cover to the next image if needed.
    pub async fn delete_image(&self, album_id: i64, image_id: i64) -> Result<Option<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let filename: Option<String> = sqlx::query_scalar(
            "DELETE FROM album_images WHERE album_id = $1 AND id = $2 RETURNING filename",
        )
        .bind(album_id)
        .bind(image_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(filename) = &filename {
            sqlx::query(
                r#"
                UPDATE albums
                SET cover_image = (
                        SELECT filename FROM album_images
                        WHERE album_id = $1
                        ORDER BY sort_order, id
                        LIMIT 1
                    ),
                    updated_at = NOW()
                WHERE id = $1 AND cover_image = $2
                "#,
            )
            .bind(album_id)
            .bind(filename)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(filename)
    }
}
