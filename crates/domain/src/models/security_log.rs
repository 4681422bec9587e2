//! Security event log and IP blocks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

/// Event type names written by the admin panel.
pub mod event_types {
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const CSRF_FAILED: &str = "csrf_failed";
    pub const IP_BLOCKED: &str = "ip_blocked";
    pub const IP_UNBLOCKED: &str = "ip_unblocked";
    pub const BLOCKED_IP_REJECTED: &str = "blocked_ip_rejected";
    pub const USER_CREATED: &str = "user_created";
    pub const USER_UPDATED: &str = "user_updated";
    pub const USER_DELETED: &str = "user_deleted";
    pub const PASSWORD_CHANGED: &str = "password_changed";
    pub const SETTINGS_CHANGED: &str = "settings_changed";
    pub const UPLOAD_REJECTED: &str = "upload_rejected";
    pub const SPAM_REJECTED: &str = "spam_rejected";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Info, Severity::Warning, Severity::Error, Severity::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: i64,
    pub event_type: String,
    pub severity: Severity,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Input for a security log insert, produced by `SecurityEventBuilder`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSecurityEvent {
    pub event_type: String,
    pub severity: Severity,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<JsonValue>,
}

/// Query string of the security log list and export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityLogQuery {
    pub event_type: Option<String>,
    pub severity: Option<String>,
    pub user_id: Option<i64>,
    pub ip: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Validated filter handed to the repository. Unknown severities are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityLogFilter {
    pub event_type: Option<String>,
    pub severity: Option<Severity>,
    pub user_id: Option<i64>,
    pub ip: Option<String>,
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound (start of the day after `date_to`).
    pub until: Option<DateTime<Utc>>,
}

impl From<&SecurityLogQuery> for SecurityLogFilter {
    fn from(query: &SecurityLogQuery) -> Self {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            event_type: non_empty(&query.event_type),
            severity: query.severity.as_deref().and_then(|s| s.parse().ok()),
            user_id: query.user_id,
            ip: non_empty(&query.ip),
            from: query
                .date_from
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
            until: query
                .date_to
                .and_then(|d| d.succ_opt())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
        }
    }
}

/// Page of security events in the `{logs, total, page, per_page, total_pages}` shape.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityLogPage {
    pub logs: Vec<SecurityEvent>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl From<shared::pagination::Paginated<SecurityEvent>> for SecurityLogPage {
    fn from(page: shared::pagination::Paginated<SecurityEvent>) -> Self {
        Self {
            logs: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityLogStats {
    pub days: u32,
    pub total: i64,
    pub by_severity: std::collections::BTreeMap<String, i64>,
    pub by_type: Vec<EventTypeCount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

impl StatsQuery {
    /// Window in days, 1..=365, default 7.
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(7).clamp(1, 365)
    }
}

/// Rows written by the CSV export, never more than this.
pub const EXPORT_ROW_LIMIT: i64 = 10_000;

/// Quotes a CSV field when needed and defuses spreadsheet formulas.
pub fn csv_field(value: &str) -> String {
    let value = if value.starts_with(['=', '+', '-', '@']) {
        format!("'{}", value)
    } else {
        value.to_string()
    };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

pub const CSV_HEADER: &str = "id,created_at,event_type,severity,user_id,ip_address,user_agent,details";

impl SecurityEvent {
    pub fn to_csv_row(&self) -> String {
        [
            self.id.to_string(),
            self.created_at.to_rfc3339(),
            csv_field(&self.event_type),
            self.severity.to_string(),
            self.user_id.map(|id| id.to_string()).unwrap_or_default(),
            csv_field(self.ip_address.as_deref().unwrap_or("")),
            csv_field(self.user_agent.as_deref().unwrap_or("")),
            csv_field(self.details.as_deref().unwrap_or("")),
        ]
        .join(",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedIp {
    pub id: i64,
    pub ip_address: String,
    pub reason: Option<String>,
    pub blocked_by: Option<i64>,
    /// `None` together with `is_permanent` means the block never lapses.
    pub blocked_until: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub created_at: DateTime<Utc>,
}

impl BlockedIp {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_permanent || self.blocked_until.map_or(true, |until| until > now)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BlockIpRequest {
    #[validate(custom(function = "validate_ip"))]
    pub ip_address: String,

    #[validate(length(max = 255, message = "Reason must be at most 255 characters"))]
    pub reason: Option<String>,

    /// Block length; ignored for permanent blocks. Defaults to 24 hours.
    #[validate(range(min = 1, max = 525_600, message = "Duration must be 1-525600 minutes"))]
    pub duration_minutes: Option<i64>,

    #[serde(default)]
    pub permanent: bool,
}

fn validate_ip(ip: &str) -> Result<(), validator::ValidationError> {
    if ip.parse::<std::net::IpAddr>().is_ok() {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("ip_address");
        err.message = Some("Invalid IP address".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("fatal".parse::<Severity>().is_err());
        assert!(Severity::Critical > Severity::Warning);
    }

    #[test]
    fn test_filter_from_query() {
        let query = SecurityLogQuery {
            event_type: Some("  ".into()),
            severity: Some("bogus".into()),
            ip: Some("192.168".into()),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..Default::default()
        };
        let filter = SecurityLogFilter::from(&query);
        assert_eq!(filter.event_type, None);
        assert_eq!(filter.severity, None);
        assert_eq!(filter.ip.as_deref(), Some("192.168"));
        assert_eq!(filter.from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(filter.until.unwrap().to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_stats_days_clamped() {
        assert_eq!(StatsQuery::default().days(), 7);
        assert_eq!(StatsQuery { days: Some(0) }.days(), 1);
        assert_eq!(StatsQuery { days: Some(9999) }.days(), 365);
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("=SUM(A1)"), "'=SUM(A1)");
    }

    #[test]
    fn test_blocked_ip_activity() {
        let now = Utc::now();
        let mut block = BlockedIp {
            id: 1,
            ip_address: "10.0.0.1".into(),
            reason: None,
            blocked_by: None,
            blocked_until: Some(now - chrono::Duration::minutes(1)),
            is_permanent: false,
            created_at: now,
        };
        assert!(!block.is_active(now));
        block.is_permanent = true;
        assert!(block.is_active(now));
    }

    #[test]
    fn test_block_request_validation() {
        let bad: BlockIpRequest = serde_json::from_str(r#"{"ip_address": "10.0.0"}"#).unwrap();
        assert!(bad.validate().is_err());
        let ok: BlockIpRequest =
            serde_json::from_str(r#"{"ip_address": "2001:db8::1", "permanent": true}"#).unwrap();
        assert!(ok.validate().is_ok());
    }
}
