//! Security event recording and login brute-force protection.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domain::models::security_log::NewSecurityEvent;
use domain::models::{BlockedIp, Setting, Severity};
use domain::services::{security_events, SecurityAlert};
use persistence::repositories::{SecurityLogRepository, SettingRepository};
use tracing::{error, info, warn};

use crate::config::SecurityConfig;
use crate::services::notifications::Notifier;

/// What a failed login led to.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedLoginOutcome {
    pub recent_failures: i64,
    pub blocked: bool,
}

/// Brute-force limits in effect for a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPolicy {
    pub max_failed_logins: u32,
    pub window_minutes: i64,
    pub block_minutes: i64,
}

impl LoginPolicy {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            max_failed_logins: config.max_failed_logins,
            window_minutes: config.failed_login_window_minutes,
            block_minutes: config.block_duration_minutes,
        }
    }

    /// Security settings saved on the settings page replace the configured limits.
    pub fn with_overrides(mut self, stored: &[Setting]) -> Self {
        for setting in stored {
            let Ok(value) = setting.value.trim().parse::<i64>() else {
                continue;
            };
            if value < 1 {
                continue;
            }
            match setting.key.as_str() {
                "max_login_attempts" => self.max_failed_logins = u32::try_from(value).unwrap_or(u32::MAX),
                "lockout_minutes" => self.window_minutes = value,
                "block_duration_minutes" => self.block_minutes = value,
                _ => {}
            }
        }
        self
    }

    pub fn should_block(&self, recent_failures: i64) -> bool {
        self.max_failed_logins > 0 && recent_failures >= i64::from(self.max_failed_logins)
    }
}

/// Writes security events and raises admin alerts for serious ones.
///
/// Recording never fails the request that triggered it: database errors are
/// logged and dropped.
#[derive(Clone)]
pub struct SecurityLog {
    repo: SecurityLogRepository,
    settings: SettingRepository,
    notifier: Notifier,
    config: Arc<SecurityConfig>,
}

impl SecurityLog {
    pub fn new(
        repo: SecurityLogRepository,
        settings: SettingRepository,
        notifier: Notifier,
        config: SecurityConfig,
    ) -> Self {
        Self {
            repo,
            settings,
            notifier,
            config: Arc::new(config),
        }
    }

    pub fn repository(&self) -> &SecurityLogRepository {
        &self.repo
    }

    pub async fn record(&self, event: NewSecurityEvent) {
        match event.severity {
            Severity::Info => info!(
                event_type = %event.event_type,
                ip = ?event.ip_address,
                user_id = ?event.user_id,
                "Security event"
            ),
            Severity::Warning => warn!(
                event_type = %event.event_type,
                ip = ?event.ip_address,
                user_id = ?event.user_id,
                "Security event"
            ),
            Severity::Error | Severity::Critical => error!(
                event_type = %event.event_type,
                severity = %event.severity,
                ip = ?event.ip_address,
                user_id = ?event.user_id,
                "Security event"
            ),
        }

        if let Err(e) = self.repo.insert(&event).await {
            error!(error = %e, event_type = %event.event_type, "Failed to store security event");
        }

        if event.severity >= Severity::Error {
            let alert = SecurityAlert {
                event_type: event.event_type.clone(),
                severity: event.severity,
                ip_address: event.ip_address.clone(),
                details: event.details.clone().unwrap_or_default(),
            };
            self.notifier.notify_admins(&alert).await;
        }
    }

    /// The active block for `ip`. Lookup errors let the request through.
    pub async fn active_block(&self, ip: &str) -> Option<BlockedIp> {
        match self.repo.active_block(ip).await {
            Ok(block) => block,
            Err(e) => {
                error!(error = %e, ip, "Failed to check IP block");
                None
            }
        }
    }

    pub async fn login_succeeded(&self, user_id: i64, username: &str, ip: &str, user_agent: Option<&str>) {
        if let Err(e) = self.repo.record_login_attempt(ip, username, true).await {
            error!(error = %e, "Failed to record login attempt");
        }
        metrics::counter!("login_attempts_total", "result" => "success").increment(1);
        self.record(security_events::login_success(user_id, username, ip, user_agent))
            .await;
    }

    /// Records a failure and blocks the IP once it crosses the threshold.
    pub async fn login_failed(&self, username: &str, ip: &str, user_agent: Option<&str>) -> FailedLoginOutcome {
        metrics::counter!("login_attempts_total", "result" => "failure").increment(1);
        if let Err(e) = self.repo.record_login_attempt(ip, username, false).await {
            error!(error = %e, "Failed to record login attempt");
        }

        let policy = self.policy().await;
        let since = Utc::now() - Duration::minutes(policy.window_minutes);
        let recent_failures = self.repo.recent_failures(ip, since).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to count recent login failures");
            0
        });

        self.record(security_events::login_failed(username, ip, user_agent, recent_failures))
            .await;

        let blocked = policy.should_block(recent_failures);
        if blocked {
            self.auto_block(ip, recent_failures, &policy).await;
        }

        FailedLoginOutcome {
            recent_failures,
            blocked,
        }
    }

    async fn policy(&self) -> LoginPolicy {
        let base = LoginPolicy::from_config(&self.config);
        match self.settings.all().await {
            Ok(stored) => base.with_overrides(&stored),
            Err(e) => {
                warn!(error = %e, "Failed to load security settings");
                base
            }
        }
    }

    async fn auto_block(&self, ip: &str, failures: i64, policy: &LoginPolicy) {
        let reason = format!(
            "{} failed logins within {} minutes",
            failures, policy.window_minutes
        );
        let until = Utc::now() + Duration::minutes(policy.block_minutes);
        match self.repo.block(ip, Some(&reason), None, Some(until), false).await {
            Ok(_) => self.record(security_events::ip_blocked(ip, &reason, None)).await,
            Err(e) => error!(error = %e, ip, "Failed to block IP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SecurityConfig {
        SecurityConfig {
            cors_origins: Vec::new(),
            login_rate_limit_per_minute: 10,
            csrf_secret: "secret".to_string(),
            max_failed_logins: 5,
            failed_login_window_minutes: 15,
            block_duration_minutes: 60,
            hsts_enabled: false,
        }
    }

    fn setting(key: &str, value: &str) -> Setting {
        Setting {
            key: key.to_string(),
            value: value.to_string(),
            group_name: "security".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_policy_overrides() {
        let policy = LoginPolicy::from_config(&config()).with_overrides(&[
            setting("max_login_attempts", "3"),
            setting("lockout_minutes", "0"),
            setting("block_duration_minutes", "120"),
            setting("site_name", "9"),
        ]);
        assert_eq!(policy.max_failed_logins, 3);
        assert_eq!(policy.window_minutes, 15);
        assert_eq!(policy.block_minutes, 120);
    }

    #[test]
    fn test_should_block() {
        let policy = LoginPolicy::from_config(&config());
        assert!(!policy.should_block(4));
        assert!(policy.should_block(5));

        let disabled = LoginPolicy {
            max_failed_logins: 0,
            ..policy
        };
        assert!(!disabled.should_block(100));
    }
}
