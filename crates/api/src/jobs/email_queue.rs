//! Delivers due rows of `email_queue`.

use chrono::{Duration, Utc};
use domain::models::{QueueStatus, QueuedEmail};
use persistence::repositories::{CampaignRepository, EmailQueueRepository};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::config::EmailConfig;
use crate::middleware::metrics::record_email_sent;
use crate::services::email::EmailMessage;
use crate::services::EmailService;

/// Rows stuck in `processing` this long are handed back to the queue.
const STUCK_AFTER_MINUTES: i64 = 15;

pub struct EmailQueueJob {
    queue: EmailQueueRepository,
    campaigns: CampaignRepository,
    email: EmailService,
    batch_size: i64,
    max_attempts: i32,
    interval_secs: u64,
}

impl EmailQueueJob {
    pub fn new(pool: PgPool, email: EmailService, config: &EmailConfig) -> Self {
        Self {
            queue: EmailQueueRepository::new(pool.clone()),
            campaigns: CampaignRepository::new(pool),
            email,
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
            interval_secs: config.queue_interval_secs,
        }
    }

    async fn deliver(&self, row: &QueuedEmail) -> Result<(), sqlx::Error> {
        let message = EmailMessage::from_stored(&row.to_email, &row.from_email, &row.subject, &row.body);
        match self.email.send(message).await {
            Ok(()) => {
                self.queue.mark_sent(row.id).await?;
                record_email_sent("sent");
                debug!(email_id = row.id, to = %row.to_email, "Queued email sent");
            }
            Err(e) => {
                let status = self.queue.mark_failed(row.id, &e.to_string(), self.max_attempts).await?;
                if status == QueueStatus::Failed {
                    record_email_sent("failed");
                    warn!(email_id = row.id, attempts = row.attempts, error = %e, "Queued email gave up");
                } else {
                    record_email_sent("retry");
                    debug!(email_id = row.id, attempts = row.attempts, error = %e, "Queued email will be retried");
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Job for EmailQueueJob {
    fn name(&self) -> &'static str {
        "email_queue"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let released = self
            .queue
            .release_stuck(now - Duration::minutes(STUCK_AFTER_MINUTES))
            .await?;
        if released > 0 {
            warn!(released, "Released emails stuck in processing");
        }

        let batch = self.queue.claim_due(self.batch_size, now).await?;
        if batch.is_empty() {
            return Ok(());
        }

        for row in &batch {
            self.deliver(row).await?;
        }

        let completed = self.campaigns.mark_completed().await?;
        info!(processed = batch.len(), campaigns_completed = completed, "Email queue batch done");
        Ok(())
    }
}
