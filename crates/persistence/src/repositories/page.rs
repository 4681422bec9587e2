//! Theme builder pages.

use domain::models::{Page, PageStatus};
use serde_json::Value as JsonValue;
use shared::pagination::{PageRequest, Paginated};
use sqlx::PgPool;

use crate::entities::PageEntity;
use crate::metrics::QueryTimer;

const PAGE_COLUMNS: &str = "id, title, slug, content, css_cache, status, created_at, updated_at";

/// Validated page fields.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub title: String,
    pub slug: String,
    pub content: JsonValue,
    pub status: PageStatus,
}

#[derive(Clone)]
pub struct PageRepository {
    pool: PgPool,
}

impl PageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<Page>, sqlx::Error> {
        let timer = QueryTimer::new("list_pages");
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tb_pages")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, PageEntity>(&format!(
            "SELECT {} FROM tb_pages ORDER BY updated_at DESC, id DESC LIMIT $1 OFFSET $2",
            PAGE_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Page>, sqlx::Error> {
        let row = sqlx::query_as::<_, PageEntity>(&format!("SELECT {} FROM tb_pages WHERE id = $1", PAGE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Page>, sqlx::Error> {
        let timer = QueryTimer::new("find_published_page");
        let row = sqlx::query_as::<_, PageEntity>(&format!(
            "SELECT {} FROM tb_pages WHERE slug = $1 AND status = 'published'",
            PAGE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(row.map(Into::into))
    }

    /// Published pages whose title contains `q` as plain text, newest first.
    pub async fn search_published(&self, q: &str, limit: i64) -> Result<Vec<Page>, sqlx::Error> {
        let timer = QueryTimer::new("search_pages");
        let rows = sqlx::query_as::<_, PageEntity>(&format!(
            r#"
            SELECT {} FROM tb_pages
            WHERE status = 'published' AND strpos(lower(title), lower($1)) > 0
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
            PAGE_COLUMNS
        ))
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tb_pages WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn create(&self, input: &PageInput) -> Result<Page, sqlx::Error> {
        let row = sqlx::query_as::<_, PageEntity>(&format!(
            r#"
            INSERT INTO tb_pages (title, slug, content, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Saving new content invalidates the cached stylesheet.
    pub async fn update(&self, id: i64, input: &PageInput) -> Result<Option<Page>, sqlx::Error> {
        let row = sqlx::query_as::<_, PageEntity>(&format!(
            r#"
            UPDATE tb_pages
            SET title = $2, slug = $3, content = $4, status = $5, css_cache = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(input.status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tb_pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn store_css_cache(&self, id: i64, css: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tb_pages SET css_cache = $2 WHERE id = $1")
            .bind(id)
            .bind(css)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drops every cached stylesheet, used after theme variables change.
    pub async fn clear_css_cache(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE tb_pages SET css_cache = NULL WHERE css_cache IS NOT NULL")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
