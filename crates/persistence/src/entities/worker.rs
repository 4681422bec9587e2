//! Worker, heartbeat and worker notification entities.

use chrono::{DateTime, Utc};
use domain::models::worker::{Heartbeat, Worker, WorkerNotification, WorkerNotificationType};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct WorkerEntity {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub email: Option<String>,
    pub status: String,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub tasks_completed: i64,
    pub tasks_failed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkerEntity> for Worker {
    fn from(entity: WorkerEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            kind: entity.kind.parse().unwrap_or_default(),
            email: entity.email,
            status: entity.status.parse().unwrap_or_default(),
            cpu_usage: entity.cpu_usage,
            memory_usage: entity.memory_usage,
            last_heartbeat: entity.last_heartbeat,
            tasks_completed: entity.tasks_completed,
            tasks_failed: entity.tasks_failed,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HeartbeatEntity {
    pub worker_id: i64,
    pub status: String,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl From<HeartbeatEntity> for Heartbeat {
    fn from(entity: HeartbeatEntity) -> Self {
        Self {
            worker_id: entity.worker_id,
            status: entity.status.parse().unwrap_or_default(),
            cpu_usage: entity.cpu_usage,
            memory_usage: entity.memory_usage,
            recorded_at: entity.recorded_at,
        }
    }
}

/// Row of `worker_notifications` joined with the worker name.
#[derive(Debug, Clone, FromRow)]
pub struct WorkerNotificationEntity {
    pub id: i64,
    pub worker_id: i64,
    pub worker_name: Option<String>,
    pub notification_type: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WorkerNotificationEntity> for WorkerNotification {
    fn from(entity: WorkerNotificationEntity) -> Self {
        Self {
            id: entity.id,
            worker_id: entity.worker_id,
            worker_name: entity.worker_name,
            notification_type: entity
                .notification_type
                .parse()
                .unwrap_or(WorkerNotificationType::StatusChanged),
            message: entity.message,
            is_read: entity.is_read,
            created_at: entity.created_at,
        }
    }
}
