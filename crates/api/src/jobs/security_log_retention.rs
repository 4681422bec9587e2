//! Deletes security log entries past their retention period.

use chrono::{Duration, Utc};
use persistence::repositories::{SecurityLogRepository, SettingRepository};
use sqlx::PgPool;
use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};

pub struct SecurityLogRetentionJob {
    logs: SecurityLogRepository,
    settings: SettingRepository,
    default_days: i64,
}

impl SecurityLogRetentionJob {
    pub fn new(pool: PgPool, default_days: i64) -> Self {
        Self {
            logs: SecurityLogRepository::new(pool.clone()),
            settings: SettingRepository::new(pool),
            default_days,
        }
    }

    /// `security_log_retention_days` from the settings page wins over config.
    async fn retention_days(&self) -> i64 {
        match self.settings.get("security_log_retention_days").await {
            Ok(Some(value)) => parse_days(&value).unwrap_or(self.default_days),
            Ok(None) => self.default_days,
            Err(e) => {
                warn!(error = %e, "Failed to read log retention setting");
                self.default_days
            }
        }
    }
}

fn parse_days(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|days| *days > 0)
}

#[async_trait::async_trait]
impl Job for SecurityLogRetentionJob {
    fn name(&self) -> &'static str {
        "security_log_retention"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let days = self.retention_days().await;
        if days <= 0 {
            return Ok(());
        }
        let deleted = self
            .logs
            .delete_before(Utc::now() - Duration::days(days))
            .await?;
        info!(deleted, retention_days = days, "Security log retention applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("30"), Some(30));
        assert_eq!(parse_days(" 90 "), Some(90));
        assert_eq!(parse_days("0"), None);
        assert_eq!(parse_days("forever"), None);
    }
}
