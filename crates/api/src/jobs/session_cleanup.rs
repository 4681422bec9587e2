//! Removes expired sessions and old login attempts, and trims the login
//! rate limiter's per-IP state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use persistence::repositories::{SecurityLogRepository, SessionRepository};
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::LoginRateLimiter;

/// Login attempts older than this no longer count towards any block window.
const LOGIN_ATTEMPT_RETENTION_DAYS: i64 = 7;

pub struct SessionCleanupJob {
    sessions: SessionRepository,
    security: SecurityLogRepository,
    limiter: Option<Arc<LoginRateLimiter>>,
}

impl SessionCleanupJob {
    pub fn new(pool: PgPool, limiter: Option<Arc<LoginRateLimiter>>) -> Self {
        Self {
            sessions: SessionRepository::new(pool.clone()),
            security: SecurityLogRepository::new(pool),
            limiter,
        }
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let sessions = self.sessions.delete_expired(now).await?;
        let attempts = self
            .security
            .delete_login_attempts_before(now - Duration::days(LOGIN_ATTEMPT_RETENTION_DAYS))
            .await?;

        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }

        if sessions > 0 || attempts > 0 {
            info!(sessions, login_attempts = attempts, "Expired session data removed");
        }
        Ok(())
    }
}
