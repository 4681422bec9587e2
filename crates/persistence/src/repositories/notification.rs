//! Database channel storage for admin notifications.

use domain::models::notification::{CenterFilter, NewStoredNotification, StatusFilter};
use domain::models::StoredNotification;
use sqlx::PgPool;

use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

/// Visibility plus the notification center filter. Binds: `$1` user id,
/// `$2` read state, `$3` level, `$4` search text.
const MATCHING: &str = r#"
    (user_id IS NULL OR user_id = $1)
    AND ($2::BOOLEAN IS NULL OR (read_at IS NOT NULL) = $2)
    AND ($3::TEXT IS NULL OR level = $3)
    AND ($4::TEXT IS NULL
         OR strpos(lower(message), lower($4)) > 0
         OR strpos(lower(kind), lower($4)) > 0)
"#;

/// Counts over every stored notification matching a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct MatchCounts {
    pub total: i64,
    pub unread: i64,
}

/// `(read, level)` binds for a status filter.
fn status_binds(status: StatusFilter) -> (Option<bool>, Option<&'static str>) {
    match status {
        StatusFilter::All => (None, None),
        StatusFilter::Read => (Some(true), None),
        StatusFilter::Unread => (Some(false), None),
        StatusFilter::Level(level) => (None, Some(level.as_str())),
    }
}

/// Rows with a NULL `user_id` are broadcast to every admin.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, notification: &NewStoredNotification) -> Result<StoredNotification, sqlx::Error> {
        let timer = QueryTimer::new("insert_notification");
        let row = sqlx::query_as::<_, NotificationEntity>(
            r#"
            INSERT INTO notifications (user_id, kind, level, message, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, kind, level, message, data, read_at, created_at
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.kind)
        .bind(notification.level.as_str())
        .bind(&notification.message)
        .bind(&notification.data)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(row.into())
    }

    /// Counts the notifications visible to `user_id` that match `filter`.
    pub async fn count_matching(&self, user_id: i64, filter: &CenterFilter) -> Result<MatchCounts, sqlx::Error> {
        let timer = QueryTimer::new("count_notifications");
        let (read, level) = status_binds(filter.status);
        let sql = format!(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE read_at IS NULL) AS unread FROM notifications WHERE {}",
            MATCHING
        );
        let counts = sqlx::query_as::<_, MatchCounts>(&sql)
            .bind(user_id)
            .bind(read)
            .bind(level)
            .bind(filter.q.as_deref())
            .fetch_one(&self.pool)
            .await?;
        timer.record();
        Ok(counts)
    }

    /// Newest `limit` notifications visible to `user_id` that match `filter`.
    pub async fn list_matching(
        &self,
        user_id: i64,
        filter: &CenterFilter,
        limit: i64,
    ) -> Result<Vec<StoredNotification>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications");
        let (read, level) = status_binds(filter.status);
        let sql = format!(
            r#"
            SELECT id, user_id, kind, level, message, data, read_at, created_at
            FROM notifications
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#,
            MATCHING
        );
        let rows = sqlx::query_as::<_, NotificationEntity>(&sql)
            .bind(user_id)
            .bind(read)
            .bind(level)
            .bind(filter.q.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        timer.record();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE (user_id IS NULL OR user_id = $1) AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Returns false when the notification does not exist or is not visible to `user_id`.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = NOW()
            WHERE (user_id IS NULL OR user_id = $1) AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND (user_id IS NULL OR user_id = $2)")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::NotificationLevel;

    #[test]
    fn test_status_binds() {
        assert_eq!(status_binds(StatusFilter::All), (None, None));
        assert_eq!(status_binds(StatusFilter::Read), (Some(true), None));
        assert_eq!(status_binds(StatusFilter::Unread), (Some(false), None));
        assert_eq!(
            status_binds(StatusFilter::Level(NotificationLevel::Warning)),
            (None, Some("warning"))
        );
    }
}
