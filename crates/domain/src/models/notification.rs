//! Stored admin notifications and the notification center query.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Warning,
    Error,
    System,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
            NotificationLevel::System => "system",
        }
    }
}

impl FromStr for NotificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationLevel::Info),
            "warning" => Ok(NotificationLevel::Warning),
            "error" => Ok(NotificationLevel::Error),
            "system" => Ok(NotificationLevel::System),
            _ => Err(format!("Unknown notification level: {}", s)),
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row of the `notifications` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: i64,
    pub user_id: Option<i64>,
    pub kind: String,
    pub level: NotificationLevel,
    pub message: String,
    pub data: JsonValue,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStoredNotification {
    pub user_id: Option<i64>,
    pub kind: String,
    pub level: NotificationLevel,
    pub message: String,
    pub data: JsonValue,
}

/// Where a notification center entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Database,
    /// The in-process broadcast log.
    Queue,
}

/// A notification center row, from either source.
#[derive(Debug, Clone, Serialize)]
pub struct CenterEntry {
    /// `db_{id}` or `queue_{seq}`.
    pub id: String,
    pub source: EntrySource,
    pub kind: String,
    pub level: NotificationLevel,
    pub message: String,
    pub data: JsonValue,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<StoredNotification> for CenterEntry {
    fn from(n: StoredNotification) -> Self {
        Self {
            id: format!("db_{}", n.id),
            source: EntrySource::Database,
            kind: n.kind,
            level: n.level,
            message: n.message,
            data: n.data,
            is_read: n.read_at.is_some(),
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Read,
    Unread,
    Level(NotificationLevel),
}

impl StatusFilter {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("read") => StatusFilter::Read,
            Some("unread") => StatusFilter::Unread,
            Some(other) => other
                .parse::<NotificationLevel>()
                .map(StatusFilter::Level)
                .unwrap_or_default(),
            None => StatusFilter::All,
        }
    }

    pub fn matches(&self, entry: &CenterEntry) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Read => entry.is_read,
            StatusFilter::Unread => !entry.is_read,
            StatusFilter::Level(level) => entry.level == *level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFilter {
    #[default]
    All,
    Database,
    Queue,
}

impl SourceFilter {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("database") => SourceFilter::Database,
            Some("queue") => SourceFilter::Queue,
            _ => SourceFilter::All,
        }
    }

    pub fn includes(&self, source: EntrySource) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Database => source == EntrySource::Database,
            SourceFilter::Queue => source == EntrySource::Queue,
        }
    }
}

pub const CENTER_PER_PAGE: u32 = 20;
pub const MAX_SEARCH_LEN: usize = 200;

/// Raw query string of `/admin/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationCenterQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub source: Option<String>,
    pub page: Option<u32>,
}

/// Whitelisted filters; anything unrecognised falls back to `all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CenterFilter {
    pub status: StatusFilter,
    pub source: SourceFilter,
    pub q: Option<String>,
    pub page: u32,
}

impl From<&NotificationCenterQuery> for CenterFilter {
    fn from(query: &NotificationCenterQuery) -> Self {
        Self {
            status: StatusFilter::parse(query.status.as_deref()),
            source: SourceFilter::parse(query.source.as_deref()),
            q: query
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(|q| q.chars().take(MAX_SEARCH_LEN).collect()),
            page: query.page.unwrap_or(1).max(1),
        }
    }
}

impl CenterFilter {
    pub fn matches(&self, entry: &CenterEntry) -> bool {
        if !self.source.includes(entry.source) || !self.status.matches(entry) {
            return false;
        }
        match &self.q {
            Some(q) => {
                let needle = q.to_lowercase();
                entry.message.to_lowercase().contains(&needle)
                    || entry.kind.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: &str, source: &str, q: &str) -> NotificationCenterQuery {
        NotificationCenterQuery {
            status: Some(status.into()),
            source: Some(source.into()),
            q: Some(q.into()),
            page: Some(0),
        }
    }

    fn entry(level: NotificationLevel, read: bool) -> CenterEntry {
        CenterEntry {
            id: "db_1".into(),
            source: EntrySource::Database,
            kind: "security_alert".into(),
            level,
            message: "Blocked 10.0.0.1".into(),
            data: JsonValue::Null,
            is_read: read,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_invalid_filters_fall_back_to_all() {
        let filter = CenterFilter::from(&query("bogus", "mars", "   "));
        assert_eq!(filter.status, StatusFilter::All);
        assert_eq!(filter.source, SourceFilter::All);
        assert_eq!(filter.q, None);
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn test_level_and_source_parse() {
        let filter = CenterFilter::from(&query("warning", "queue", "x"));
        assert_eq!(filter.status, StatusFilter::Level(NotificationLevel::Warning));
        assert_eq!(filter.source, SourceFilter::Queue);
    }

    #[test]
    fn test_search_is_truncated() {
        let long = "a".repeat(500);
        let filter = CenterFilter::from(&query("all", "all", &long));
        assert_eq!(filter.q.unwrap().len(), MAX_SEARCH_LEN);
    }

    #[test]
    fn test_matches() {
        let filter = CenterFilter::from(&query("unread", "database", "BLOCKED"));
        assert!(filter.matches(&entry(NotificationLevel::Error, false)));
        assert!(!filter.matches(&entry(NotificationLevel::Error, true)));

        let by_kind = CenterFilter::from(&query("error", "all", "security"));
        assert!(by_kind.matches(&entry(NotificationLevel::Error, true)));
        assert!(!by_kind.matches(&entry(NotificationLevel::Info, true)));
    }

    #[test]
    fn test_stored_notification_ids_are_prefixed() {
        let stored = StoredNotification {
            id: 42,
            user_id: None,
            kind: "user_welcome".into(),
            level: NotificationLevel::Info,
            message: "Welcome".into(),
            data: JsonValue::Null,
            read_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        let entry = CenterEntry::from(stored);
        assert_eq!(entry.id, "db_42");
        assert!(entry.is_read);
    }
}
