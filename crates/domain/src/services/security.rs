//! Fluent construction of security log events.

use serde_json::{Map, Value as JsonValue};

use crate::models::security_log::{event_types, NewSecurityEvent, Severity};

/// Longest user agent kept in the log.
const MAX_USER_AGENT: usize = 500;

#[derive(Debug, Clone)]
pub struct SecurityEventBuilder {
    event: NewSecurityEvent,
    metadata: Map<String, JsonValue>,
}

impl SecurityEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event: NewSecurityEvent {
                event_type: event_type.into(),
                severity: Severity::Info,
                user_id: None,
                ip_address: None,
                user_agent: None,
                details: None,
                metadata: None,
            },
            metadata: Map::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.event.severity = severity;
        self
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.event.user_id = Some(user_id);
        self
    }

    pub fn maybe_user(mut self, user_id: Option<i64>) -> Self {
        self.event.user_id = user_id;
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.event.ip_address = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: Option<&str>) -> Self {
        self.event.user_agent = user_agent
            .filter(|ua| !ua.is_empty())
            .map(|ua| ua.chars().take(MAX_USER_AGENT).collect());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.event.details = Some(details.into());
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn build(mut self) -> NewSecurityEvent {
        if !self.metadata.is_empty() {
            self.event.metadata = Some(JsonValue::Object(self.metadata));
        }
        self.event
    }
}

/// Shortcuts for the events the admin panel writes.
pub mod security_events {
    use super::*;

    pub fn login_success(user_id: i64, username: &str, ip: &str, ua: Option<&str>) -> NewSecurityEvent {
        SecurityEventBuilder::new(event_types::LOGIN_SUCCESS)
            .user(user_id)
            .ip(ip)
            .user_agent(ua)
            .details(format!("User {} logged in", username))
            .build()
    }

    pub fn login_failed(username: &str, ip: &str, ua: Option<&str>, recent_failures: i64) -> NewSecurityEvent {
        let severity = if recent_failures >= 3 {
            Severity::Warning
        } else {
            Severity::Info
        };
        SecurityEventBuilder::new(event_types::LOGIN_FAILED)
            .severity(severity)
            .ip(ip)
            .user_agent(ua)
            .details(format!("Failed login for {}", username))
            .meta("username", username)
            .meta("recent_failures", recent_failures)
            .build()
    }

    pub fn ip_blocked(ip: &str, reason: &str, by_user: Option<i64>) -> NewSecurityEvent {
        SecurityEventBuilder::new(event_types::IP_BLOCKED)
            .severity(if by_user.is_some() { Severity::Warning } else { Severity::Error })
            .maybe_user(by_user)
            .ip(ip)
            .details(reason.to_string())
            .meta("automatic", by_user.is_none())
            .build()
    }

    pub fn csrf_failed(ip: &str, path: &str) -> NewSecurityEvent {
        SecurityEventBuilder::new(event_types::CSRF_FAILED)
            .severity(Severity::Warning)
            .ip(ip)
            .details(format!("CSRF validation failed on {}", path))
            .meta("path", path)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let event = SecurityEventBuilder::new("custom").build();
        assert_eq!(event.event_type, "custom");
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.metadata, None);
    }

    #[test]
    fn test_builder_fields() {
        let long_ua = "x".repeat(800);
        let event = SecurityEventBuilder::new(event_types::USER_DELETED)
            .severity(Severity::Warning)
            .user(5)
            .ip("127.0.0.1")
            .user_agent(Some(&long_ua))
            .details("deleted bob")
            .meta("target_user_id", 9)
            .build();
        assert_eq!(event.user_id, Some(5));
        assert_eq!(event.user_agent.unwrap().len(), MAX_USER_AGENT);
        assert_eq!(event.metadata.unwrap()["target_user_id"], 9);
    }

    #[test]
    fn test_login_failed_escalates() {
        let first = security_events::login_failed("bob", "1.2.3.4", None, 1);
        let third = security_events::login_failed("bob", "1.2.3.4", None, 3);
        assert_eq!(first.severity, Severity::Info);
        assert_eq!(third.severity, Severity::Warning);
        assert_eq!(third.metadata.unwrap()["username"], "bob");
    }

    #[test]
    fn test_automatic_ip_block_is_error() {
        let event = security_events::ip_blocked("1.2.3.4", "Too many failed logins", None);
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.metadata.unwrap()["automatic"], true);
    }
}
