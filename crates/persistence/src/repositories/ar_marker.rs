use domain::models::ArMarkerRecord;
use sqlx::PgPool;

use crate::entities::ArMarkerEntity;

#[derive(Clone)]
pub struct ArMarkerRepository {
    pool: PgPool,
}

impl ArMarkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<ArMarkerRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ArMarkerEntity>(
            "SELECT id, entity_id, pattern, created_at FROM ar_markers ORDER BY entity_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ArMarkerRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, ArMarkerEntity>(
            "SELECT id, entity_id, pattern, created_at FROM ar_markers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Stores the pattern for `entity_id`. Patterns are deterministic, so an
    /// existing row is returned unchanged.
    pub async fn upsert(&self, entity_id: i64, pattern: &str) -> Result<ArMarkerRecord, sqlx::Error> {
        let row = sqlx::query_as::<_, ArMarkerEntity>(
            r#"
            INSERT INTO ar_markers (entity_id, pattern)
            VALUES ($1, $2)
            ON CONFLICT (entity_id) DO UPDATE SET pattern = EXCLUDED.pattern
            RETURNING id, entity_id, pattern, created_at
            "#,
        )
        .bind(entity_id)
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ar_markers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
