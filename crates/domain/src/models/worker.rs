//! Workers, heartbeats and worker notifications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    #[default]
    Human,
    Automated,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Human => "human",
            WorkerKind::Automated => "automated",
        }
    }
}

impl FromStr for WorkerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(WorkerKind::Human),
            "automated" => Ok(WorkerKind::Automated),
            _ => Err(format!("Unknown worker kind: {}", s)),
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[default]
    Active,
    Idle,
    Offline,
    Failed,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Active => "active",
            WorkerStatus::Idle => "idle",
            WorkerStatus::Offline => "offline",
            WorkerStatus::Failed => "failed",
        }
    }
}

impl FromStr for WorkerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(WorkerStatus::Active),
            "idle" => Ok(WorkerStatus::Idle),
            "offline" => Ok(WorkerStatus::Offline),
            "failed" => Ok(WorkerStatus::Failed),
            _ => Err(format!("Unknown worker status: {}", s)),
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    pub name: String,
    pub kind: WorkerKind,
    pub email: Option<String>,
    pub status: WorkerStatus,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub tasks_completed: i64,
    pub tasks_failed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    /// Share of failed tasks, `None` before any task finished.
    pub fn failure_rate(&self) -> Option<f64> {
        let total = self.tasks_completed + self.tasks_failed;
        if total <= 0 {
            return None;
        }
        Some(self.tasks_failed as f64 / total as f64)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkerRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    pub kind: WorkerKind,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(default)]
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateWorkerRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    pub kind: WorkerKind,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(default)]
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub worker_id: i64,
    pub status: WorkerStatus,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Body of `POST /api/workers/:id/heartbeat`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub status: WorkerStatus,

    #[validate(range(min = 0.0, max = 100.0, message = "CPU usage must be 0-100"))]
    pub cpu_usage: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Memory usage must be 0-100"))]
    pub memory_usage: Option<f64>,

    #[validate(range(min = 0, message = "Task counts must not be negative"))]
    #[serde(default)]
    pub tasks_completed: i64,

    #[validate(range(min = 0, message = "Task counts must not be negative"))]
    #[serde(default)]
    pub tasks_failed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerNotificationType {
    HeartbeatMissed,
    HighCpu,
    HighMemory,
    TaskFailed,
    StatusChanged,
    Recovered,
}

impl WorkerNotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerNotificationType::HeartbeatMissed => "heartbeat_missed",
            WorkerNotificationType::HighCpu => "high_cpu",
            WorkerNotificationType::HighMemory => "high_memory",
            WorkerNotificationType::TaskFailed => "task_failed",
            WorkerNotificationType::StatusChanged => "status_changed",
            WorkerNotificationType::Recovered => "recovered",
        }
    }
}

impl FromStr for WorkerNotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heartbeat_missed" => Ok(WorkerNotificationType::HeartbeatMissed),
            "high_cpu" => Ok(WorkerNotificationType::HighCpu),
            "high_memory" => Ok(WorkerNotificationType::HighMemory),
            "task_failed" => Ok(WorkerNotificationType::TaskFailed),
            "status_changed" => Ok(WorkerNotificationType::StatusChanged),
            "recovered" => Ok(WorkerNotificationType::Recovered),
            _ => Err(format!("Unknown worker notification type: {}", s)),
        }
    }
}

impl fmt::Display for WorkerNotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNotification {
    pub id: i64,
    pub worker_id: i64,
    pub worker_name: Option<String>,
    pub notification_type: WorkerNotificationType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for `worker_notifications` inserts.
#[derive(Debug, Clone)]
pub struct NewWorkerNotification {
    pub worker_id: i64,
    pub notification_type: WorkerNotificationType,
    pub message: String,
}

/// Filter for the worker notification list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerNotificationQuery {
    pub worker_id: Option<i64>,
    pub unread_only: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Row of the worker status dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatusView {
    #[serde(flatten)]
    pub worker: Worker,
    pub healthy: bool,
    pub alerts: Vec<crate::services::monitoring::WorkerAlert>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(completed: i64, failed: i64) -> Worker {
        Worker {
            id: 1,
            name: "importer".into(),
            kind: WorkerKind::Automated,
            email: None,
            status: WorkerStatus::Active,
            cpu_usage: None,
            memory_usage: None,
            last_heartbeat: None,
            tasks_completed: completed,
            tasks_failed: failed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!(WorkerStatus::from_str("OFFLINE").unwrap(), WorkerStatus::Offline);
        assert_eq!(WorkerKind::Automated.to_string(), "automated");
        assert_eq!(
            WorkerNotificationType::from_str("high_memory").unwrap(),
            WorkerNotificationType::HighMemory
        );
        assert!(WorkerNotificationType::from_str("bogus").is_err());
    }

    #[test]
    fn test_failure_rate() {
        assert_eq!(worker(0, 0).failure_rate(), None);
        assert_eq!(worker(3, 1).failure_rate(), Some(0.25));
    }

    #[test]
    fn test_heartbeat_request_validation() {
        let req: HeartbeatRequest =
            serde_json::from_str(r#"{"status": "idle", "cpu_usage": 150}"#).unwrap();
        assert!(req.validate().is_err());

        let req: HeartbeatRequest = serde_json::from_str(r#"{"cpu_usage": 12.5}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, WorkerStatus::Active);
    }

    #[test]
    fn test_create_worker_requires_name() {
        let req: CreateWorkerRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
