//! Marks silent workers offline and alerts admins once per outage.

use chrono::{DateTime, Duration, Utc};
use domain::models::worker::NewWorkerNotification;
use domain::models::{Worker, WorkerNotificationType};
use domain::services::{WorkerAlert, WorkerHeartbeatMissed};
use persistence::repositories::WorkerRepository;
use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::app::AppState;

pub struct WorkerHealthJob {
    state: AppState,
}

impl WorkerHealthJob {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn minutes_since(worker: &Worker, now: DateTime<Utc>) -> Option<i64> {
    worker.last_heartbeat.map(|at| (now - at).num_minutes().max(0))
}

/// Worker notification row for a missed heartbeat.
fn missed_note(worker: &Worker, now: DateTime<Utc>) -> NewWorkerNotification {
    let alert = WorkerAlert::HeartbeatMissed {
        minutes_since: minutes_since(worker, now),
    };
    NewWorkerNotification {
        worker_id: worker.id,
        notification_type: WorkerNotificationType::HeartbeatMissed,
        message: alert.message(&worker.name),
    }
}

#[async_trait::async_trait]
impl Job for WorkerHealthJob {
    fn name(&self) -> &'static str {
        "worker_health"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.state.config.workers.sweep_interval_secs)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let repo = WorkerRepository::new(self.state.pool.clone());
        let thresholds = self.state.thresholds().await;
        let now = Utc::now();

        let stale = repo
            .mark_stale_offline(now - Duration::minutes(thresholds.heartbeat_minutes))
            .await?;

        for worker in &stale {
            if let Err(e) = repo.insert_notification(&missed_note(worker, now)).await {
                warn!(worker_id = worker.id, error = %e, "Failed to store heartbeat notification");
            }
            self.state
                .notifier
                .notify_admins(&WorkerHeartbeatMissed {
                    worker_id: worker.id,
                    worker_name: worker.name.clone(),
                    minutes_since: minutes_since(worker, now),
                    dashboard_url: self.state.config.admin_url("/admin/workers"),
                })
                .await;
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "Workers marked offline");
        }

        let retention_days = self.state.config.workers.heartbeat_retention_days;
        if retention_days > 0 {
            let pruned = repo
                .delete_heartbeats_before(now - Duration::days(retention_days))
                .await?;
            if pruned > 0 {
                info!(pruned, "Old heartbeats removed");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::worker::{WorkerKind, WorkerStatus};

    fn worker(last_heartbeat: Option<DateTime<Utc>>) -> Worker {
        let now = Utc::now();
        Worker {
            id: 3,
            name: "render-1".to_string(),
            kind: WorkerKind::Automated,
            email: None,
            status: WorkerStatus::Offline,
            cpu_usage: None,
            memory_usage: None,
            last_heartbeat,
            tasks_completed: 0,
            tasks_failed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missed_note_counts_minutes() {
        let now = Utc::now();
        let note = missed_note(&worker(Some(now - Duration::minutes(17))), now);
        assert_eq!(note.worker_id, 3);
        assert_eq!(note.notification_type, WorkerNotificationType::HeartbeatMissed);
        assert!(note.message.contains("17 minutes"));
    }

    #[test]
    fn test_missed_note_never_reported() {
        let note = missed_note(&worker(None), Utc::now());
        assert!(note.message.contains("never"));
    }
}
