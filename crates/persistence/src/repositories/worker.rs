//! Worker repository: registry, heartbeats and worker notifications.

use chrono::{DateTime, Utc};
use domain::models::worker::{
    CreateWorkerRequest, HeartbeatRequest, NewWorkerNotification, UpdateWorkerRequest,
    WorkerNotificationQuery,
};
use domain::models::{Worker, WorkerNotification};
use shared::pagination::{PageRequest, Paginated};
use sqlx::PgPool;

use crate::entities::{HeartbeatEntity, WorkerEntity, WorkerNotificationEntity};
use crate::metrics::QueryTimer;

const WORKER_COLUMNS: &str = r#"
    id, name, kind, email, status, cpu_usage, memory_usage, last_heartbeat,
    tasks_completed, tasks_failed, created_at, updated_at
"#;

/// Fields written on create and update.
#[derive(Debug, Clone)]
pub struct WorkerInput {
    pub name: String,
    pub kind: String,
    pub email: Option<String>,
    pub status: String,
}

impl From<&CreateWorkerRequest> for WorkerInput {
    fn from(req: &CreateWorkerRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            kind: req.kind.as_str().to_string(),
            email: domain::models::user::normalize_email(req.email.as_deref()),
            status: req.status.as_str().to_string(),
        }
    }
}

impl From<&UpdateWorkerRequest> for WorkerInput {
    fn from(req: &UpdateWorkerRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            kind: req.kind.as_str().to_string(),
            email: domain::models::user::normalize_email(req.email.as_deref()),
            status: req.status.as_str().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct WorkerRepository {
    pool: PgPool,
}

impl WorkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<Worker>, sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
            .fetch_one(&self.pool)
            .await?;
        let query = format!(
            "SELECT {} FROM workers ORDER BY name LIMIT $1 OFFSET $2",
            WORKER_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    /// Every worker, for the status dashboard.
    pub async fn all(&self) -> Result<Vec<Worker>, sqlx::Error> {
        let timer = QueryTimer::new("list_all_workers");
        let query = format!("SELECT {} FROM workers ORDER BY name", WORKER_COLUMNS);
        let rows = sqlx::query_as::<_, WorkerEntity>(&query)
            .fetch_all(&self.pool)
            .await?;
        timer.record();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Worker>, sqlx::Error> {
        let query = format!("SELECT {} FROM workers WHERE id = $1", WORKER_COLUMNS);
        let row = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(&self, input: &WorkerInput) -> Result<Worker, sqlx::Error> {
        let query = format!(
            "INSERT INTO workers (name, kind, email, status) VALUES ($1, $2, $3, $4) RETURNING {}",
            WORKER_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(&input.name)
            .bind(&input.kind)
            .bind(&input.email)
            .bind(&input.status)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn update(&self, id: i64, input: &WorkerInput) -> Result<Worker, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE workers
            SET name = $2, kind = $3, email = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            WORKER_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.kind)
            .bind(&input.email)
            .bind(&input.status)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Into::into).ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stores a heartbeat and the reported state on the worker row.
    ///
    /// Returns the worker as it was before the heartbeat.
    pub async fn record_heartbeat(&self, id: i64, beat: &HeartbeatRequest) -> Result<Option<Worker>, sqlx::Error> {
        let timer = QueryTimer::new("record_heartbeat");
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {} FROM workers WHERE id = $1 FOR UPDATE", WORKER_COLUMNS);
        let Some(before) = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO worker_heartbeats (worker_id, status, cpu_usage, memory_usage)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(beat.status.as_str())
        .bind(beat.cpu_usage)
        .bind(beat.memory_usage)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE workers
            SET status = $2, cpu_usage = $3, memory_usage = $4, last_heartbeat = NOW(),
                tasks_completed = GREATEST(tasks_completed, $5),
                tasks_failed = GREATEST(tasks_failed, $6),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(beat.status.as_str())
        .bind(beat.cpu_usage)
        .bind(beat.memory_usage)
        .bind(beat.tasks_completed)
        .bind(beat.tasks_failed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(before.into()))
    }

    /// Heartbeat timestamps since `since`, optionally for one worker.
    pub async fn heartbeat_times(
        &self,
        since: DateTime<Utc>,
        worker_id: Option<i64>,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        let timer = QueryTimer::new("heartbeat_history");
        let rows = sqlx::query_as::<_, HeartbeatEntity>(
            r#"
            SELECT worker_id, status, cpu_usage, memory_usage, recorded_at
            FROM worker_heartbeats
            WHERE recorded_at >= $1 AND ($2::BIGINT IS NULL OR worker_id = $2)
            ORDER BY recorded_at
            "#,
        )
        .bind(since)
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(rows.into_iter().map(|r| r.recorded_at).collect())
    }

    /// Marks workers silent since before `cutoff` as offline and returns them.
    ///
    /// Workers already offline or failed are left alone, so each outage is reported once.
    pub async fn mark_stale_offline(&self, cutoff: DateTime<Utc>) -> Result<Vec<Worker>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE workers
            SET status = 'offline', updated_at = NOW()
            WHERE status IN ('active', 'idle')
              AND (last_heartbeat IS NULL OR last_heartbeat < $1)
            RETURNING {}
            "#,
            WORKER_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkerEntity>(&query)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn delete_heartbeats_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM worker_heartbeats WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_notification(&self, n: &NewWorkerNotification) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO worker_notifications (worker_id, notification_type, message)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(n.worker_id)
        .bind(n.notification_type.as_str())
        .bind(&n.message)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_notifications(
        &self,
        query: &WorkerNotificationQuery,
    ) -> Result<Paginated<WorkerNotification>, sqlx::Error> {
        let page = PageRequest {
            page: query.page,
            per_page: query.per_page,
        };
        let unread_only = query.unread_only.unwrap_or(false);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM worker_notifications
            WHERE ($1::BIGINT IS NULL OR worker_id = $1) AND (NOT $2 OR NOT is_read)
            "#,
        )
        .bind(query.worker_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, WorkerNotificationEntity>(
            r#"
            SELECT n.id, n.worker_id, w.name AS worker_name, n.notification_type, n.message,
                   n.is_read, n.created_at
            FROM worker_notifications n
            LEFT JOIN workers w ON w.id = n.worker_id
            WHERE ($1::BIGINT IS NULL OR n.worker_id = $1) AND (NOT $2 OR NOT n.is_read)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.worker_id)
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, &page))
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE worker_notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE worker_notifications SET is_read = TRUE WHERE NOT is_read")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_notification_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM worker_notifications WHERE NOT is_read")
            .fetch_one(&self.pool)
            .await
    }
}
