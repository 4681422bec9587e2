//! Security log, notification and IP block entities.

use chrono::{DateTime, Utc};
use domain::models::{BlockedIp, SecurityEvent, StoredNotification};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SecurityEventEntity {
    pub id: i64,
    pub event_type: String,
    pub severity: String,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl From<SecurityEventEntity> for SecurityEvent {
    fn from(entity: SecurityEventEntity) -> Self {
        Self {
            id: entity.id,
            event_type: entity.event_type,
            severity: entity.severity.parse().unwrap_or_default(),
            user_id: entity.user_id,
            ip_address: entity.ip_address,
            user_agent: entity.user_agent,
            details: entity.details,
            metadata: entity.metadata,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockedIpEntity {
    pub id: i64,
    pub ip_address: String,
    pub reason: Option<String>,
    pub blocked_by: Option<i64>,
    pub blocked_until: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BlockedIpEntity> for BlockedIp {
    fn from(entity: BlockedIpEntity) -> Self {
        Self {
            id: entity.id,
            ip_address: entity.ip_address,
            reason: entity.reason,
            blocked_by: entity.blocked_by,
            blocked_until: entity.blocked_until,
            is_permanent: entity.is_permanent,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: i64,
    pub user_id: Option<i64>,
    pub kind: String,
    pub level: String,
    pub message: String,
    pub data: JsonValue,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEntity> for StoredNotification {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            kind: entity.kind,
            level: entity.level.parse().unwrap_or_default(),
            message: entity.message,
            data: entity.data,
            read_at: entity.read_at,
            created_at: entity.created_at,
        }
    }
}

/// Grouped count row used by the stats queries.
#[derive(Debug, Clone, FromRow)]
pub struct CountRow {
    pub label: String,
    pub count: i64,
}
