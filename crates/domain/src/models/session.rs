//! Server-side sessions.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A session row. The cookie carries a random token; only its SHA-256 is stored.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// `None` for anonymous sessions that only carry a CSRF token.
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Input for a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token_hash: String,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    pub fn new(token_hash: String, ttl: Duration) -> Self {
        Self {
            token_hash,
            user_id: None,
            ip_address: None,
            user_agent: None,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn for_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent.map(|ua| ua.chars().take(500).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_builder() {
        let session = NewSession::new("hash".into(), Duration::hours(2))
            .for_user(5)
            .with_client(Some("10.0.0.1".into()), Some("x".repeat(600)));
        assert_eq!(session.user_id, Some(5));
        assert_eq!(session.user_agent.unwrap().len(), 500);
        assert!(session.expires_at > Utc::now() + Duration::minutes(119));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let session = Session {
            id: 1,
            token_hash: "h".into(),
            user_id: None,
            ip_address: None,
            user_agent: None,
            expires_at: now,
            created_at: now,
            last_seen_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
        assert!(!session.is_authenticated());
    }
}
