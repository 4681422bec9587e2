//! Email campaigns and the outgoing email queue.

use chrono::{DateTime, Utc};
use domain::models::email_campaign::{EmailQueueQuery, NewCampaign, NewQueuedEmail, QueueCounts};
use domain::models::{CampaignStatus, EmailCampaign, QueueStatus, QueuedEmail};
use shared::pagination::{PageRequest, Paginated};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::{CountRow, EmailCampaignEntity, QueuedEmailEntity};
use crate::metrics::QueryTimer;

const CAMPAIGN_COLUMNS: &str =
    "id, name, goal, audience, offer, language, tone, num_emails, emails, status, created_at, updated_at";

const QUEUE_COLUMNS: &str = "id, to_email, from_email, subject, body, status, attempts, last_error, \
     campaign_id, scheduled_at, created_at, updated_at, sent_at";

#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<EmailCampaign>, sqlx::Error> {
        let timer = QueryTimer::new("list_campaigns");
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_campaigns")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, EmailCampaignEntity>(&format!(
            "SELECT {} FROM email_campaigns ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            CAMPAIGN_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<EmailCampaign>, sqlx::Error> {
        let row = sqlx::query_as::<_, EmailCampaignEntity>(&format!(
            "SELECT {} FROM email_campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(&self, campaign: &NewCampaign) -> Result<EmailCampaign, sqlx::Error> {
        let row = sqlx::query_as::<_, EmailCampaignEntity>(&format!(
            r#"
            INSERT INTO email_campaigns (name, goal, audience, offer, language, tone, num_emails, emails)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(&campaign.name)
        .bind(&campaign.goal)
        .bind(&campaign.audience)
        .bind(&campaign.offer)
        .bind(&campaign.language)
        .bind(&campaign.tone)
        .bind(campaign.num_emails)
        .bind(Json(&campaign.emails))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_campaigns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Queues `rows` and flips the campaign to `queued`, all or nothing.
    ///
    /// Test sends pass `mark_queued = false` so the campaign stays a draft.
    pub async fn enqueue(&self, campaign_id: i64, rows: &[NewQueuedEmail], mark_queued: bool) -> Result<usize, sqlx::Error> {
        let timer = QueryTimer::new("enqueue_campaign");
        let mut tx = self.pool.begin().await?;

        for row in rows {
            insert_queued(&mut *tx, row).await?;
        }

        if mark_queued {
            sqlx::query("UPDATE email_campaigns SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(campaign_id)
                .bind(CampaignStatus::Queued.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(rows.len())
    }

    /// Marks queued campaigns whose emails have all gone out as sent.
    pub async fn mark_completed(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE email_campaigns c SET status = 'sent', updated_at = NOW()
            WHERE c.status = 'queued'
              AND NOT EXISTS (
                SELECT 1 FROM email_queue q
                WHERE q.campaign_id = c.id AND q.status IN ('pending', 'processing')
              )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn insert_queued<'e, E>(executor: E, row: &NewQueuedEmail) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO email_queue (to_email, from_email, subject, body, campaign_id, scheduled_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&row.to_email)
    .bind(&row.from_email)
    .bind(&row.subject)
    .bind(&row.body)
    .bind(row.campaign_id)
    .bind(row.scheduled_at)
    .fetch_one(executor)
    .await
}

#[derive(Clone)]
pub struct EmailQueueRepository {
    pool: PgPool,
}

impl EmailQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &EmailQueueQuery) -> Result<Paginated<QueuedEmail>, sqlx::Error> {
        let timer = QueryTimer::new("list_email_queue");
        let page = PageRequest {
            page: query.page,
            per_page: query.per_page,
        };
        let status = query.status().map(|s| s.as_str());
        let search = query.search();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM email_queue
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR to_email ILIKE '%' || $2 || '%' OR subject ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(status)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, QueuedEmailEntity>(&format!(
            r#"
            SELECT {}
            FROM email_queue
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR to_email ILIKE '%' || $2 || '%' OR subject ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            QUEUE_COLUMNS
        ))
        .bind(status)
        .bind(&search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, &page))
    }

    pub async fn counts(&self) -> Result<QueueCounts, sqlx::Error> {
        let rows = sqlx::query_as::<_, CountRow>(
            "SELECT status AS label, COUNT(*) AS count FROM email_queue GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = QueueCounts::default();
        for row in rows {
            match row.label.parse::<QueueStatus>() {
                Ok(QueueStatus::Pending) => counts.pending = row.count,
                Ok(QueueStatus::Processing) => counts.processing = row.count,
                Ok(QueueStatus::Sent) => counts.sent = row.count,
                Ok(QueueStatus::Failed) => counts.failed = row.count,
                Err(_) => {}
            }
        }
        Ok(counts)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<QueuedEmail>, sqlx::Error> {
        let row = sqlx::query_as::<_, QueuedEmailEntity>(&format!(
            "SELECT {} FROM email_queue WHERE id = $1",
            QUEUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn enqueue(&self, row: &NewQueuedEmail) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("enqueue_email");
        let id = insert_queued(&self.pool, row).await?;
        timer.record();
        Ok(id)
    }

    /// Claims up to `batch` due emails by moving them to `processing`.
    ///
    /// `SKIP LOCKED` lets several instances drain the queue without sending twice.
    pub async fn claim_due(&self, batch: i64, now: DateTime<Utc>) -> Result<Vec<QueuedEmail>, sqlx::Error> {
        let timer = QueryTimer::new("claim_due_emails");
        let rows = sqlx::query_as::<_, QueuedEmailEntity>(&format!(
            r#"
            UPDATE email_queue SET status = 'processing', attempts = attempts + 1, updated_at = NOW()
            WHERE id IN (
                SELECT id FROM email_queue
                WHERE status = 'pending' AND scheduled_at <= $1
                ORDER BY scheduled_at, id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            QUEUE_COLUMNS
        ))
        .bind(now)
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn mark_sent(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE email_queue
            SET status = 'sent', sent_at = NOW(), last_error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Puts the email back to `pending` until `max_attempts` is reached, then `failed`.
    pub async fn mark_failed(&self, id: i64, error: &str, max_attempts: i32) -> Result<QueueStatus, sqlx::Error> {
        let status: String = sqlx::query_scalar(
            r#"
            UPDATE email_queue
            SET status = CASE WHEN attempts >= $3 THEN 'failed' ELSE 'pending' END,
                last_error = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;
        Ok(status.parse().unwrap_or_default())
    }

    /// Requeues an unsent email with a fresh attempt budget.
    pub async fn retry(&self, id: i64) -> Result<Option<QueuedEmail>, sqlx::Error> {
        let row = sqlx::query_as::<_, QueuedEmailEntity>(&format!(
            r#"
            UPDATE email_queue
            SET status = 'pending', attempts = 0, last_error = NULL, scheduled_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status <> 'sent'
            RETURNING {}
            "#,
            QUEUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Emails stuck in `processing` (e.g. after a crash) go back to `pending`.
    pub async fn release_stuck(&self, older_than: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE email_queue SET status = 'pending', updated_at = NOW() WHERE status = 'processing' AND updated_at < $1",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_queue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
