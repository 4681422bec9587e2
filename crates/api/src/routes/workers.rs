//! Worker admin, the monitoring dashboard API, heartbeats and worker notifications.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use domain::models::worker::{
    CreateWorkerRequest, HeartbeatRequest, NewWorkerNotification, UpdateWorkerRequest,
    WorkerKind, WorkerNotificationQuery, WorkerStatus, WorkerStatusView,
};
use domain::models::{Worker, WorkerNotification, WorkerNotificationType};
use domain::services::{
    bucket_heartbeats, HeartbeatHistory, HistoryWindow, MonitoringThresholds, WorkerAlert,
    WorkerResourceAlert,
};
use persistence::repositories::{WorkerInput, WorkerRepository};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::pagination::{PageRequest, Paginated};
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::AuthUser;
use crate::routes::csrf_for;

#[derive(Debug, Serialize)]
pub struct WorkerForm {
    pub csrf_token: String,
    pub kinds: [WorkerKind; 2],
    pub statuses: [WorkerStatus; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub unread_notifications: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub workers: Vec<WorkerStatusView>,
    pub summary: StatusSummary,
    pub thresholds: ThresholdsView,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ThresholdsView {
    pub heartbeat_minutes: i64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl From<MonitoringThresholds> for ThresholdsView {
    fn from(t: MonitoringThresholds) -> Self {
        Self {
            heartbeat_minutes: t.heartbeat_minutes,
            cpu_percent: t.cpu_percent,
            memory_percent: t.memory_percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<u32>,
    pub worker_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub hours: i64,
    pub worker_id: Option<i64>,
    #[serde(flatten)]
    pub history: HeartbeatHistory,
}

fn form(state: &AppState, user: &AuthUser, worker: Option<Worker>) -> WorkerForm {
    WorkerForm {
        csrf_token: csrf_for(state, user),
        kinds: [WorkerKind::Human, WorkerKind::Automated],
        statuses: [
            WorkerStatus::Active,
            WorkerStatus::Idle,
            WorkerStatus::Offline,
            WorkerStatus::Failed,
        ],
        worker,
    }
}

fn status_view(worker: Worker, thresholds: &MonitoringThresholds, now: DateTime<Utc>) -> WorkerStatusView {
    let health = thresholds.evaluate(&worker, now);
    WorkerStatusView {
        worker,
        healthy: health.healthy,
        alerts: health.alerts,
    }
}

fn alert_type(alert: &WorkerAlert) -> WorkerNotificationType {
    match alert {
        WorkerAlert::HeartbeatMissed { .. } => WorkerNotificationType::HeartbeatMissed,
        WorkerAlert::HighCpu { .. } => WorkerNotificationType::HighCpu,
        WorkerAlert::HighMemory { .. } => WorkerNotificationType::HighMemory,
        WorkerAlert::Failing { .. } => WorkerNotificationType::TaskFailed,
    }
}

fn same_kind(a: &WorkerAlert, b: &WorkerAlert) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// What a heartbeat changed, as worker notifications plus the resource
/// alerts that newly appeared.
fn heartbeat_transitions(
    before: &Worker,
    after: &Worker,
    thresholds: &MonitoringThresholds,
    now: DateTime<Utc>,
) -> (Vec<NewWorkerNotification>, Vec<WorkerAlert>) {
    let mut notes = Vec::new();
    let note = |kind, message: String| NewWorkerNotification {
        worker_id: after.id,
        notification_type: kind,
        message,
    };

    if before.status != after.status {
        let back_online = matches!(before.status, WorkerStatus::Offline | WorkerStatus::Failed)
            && matches!(after.status, WorkerStatus::Active | WorkerStatus::Idle);
        if back_online {
            notes.push(note(
                WorkerNotificationType::Recovered,
                format!("{} is reporting again ({})", after.name, after.status.as_str()),
            ));
        } else {
            notes.push(note(
                WorkerNotificationType::StatusChanged,
                format!(
                    "{} changed status from {} to {}",
                    after.name,
                    before.status.as_str(),
                    after.status.as_str()
                ),
            ));
        }
    }

    if after.tasks_failed > before.tasks_failed {
        notes.push(note(
            WorkerNotificationType::TaskFailed,
            format!(
                "{} reported {} failed task(s)",
                after.name,
                after.tasks_failed - before.tasks_failed
            ),
        ));
    }

    // The heartbeat itself clears a missed-heartbeat state, so only resource
    // and failure alerts are compared against the previous reading.
    let previous = thresholds.evaluate(before, now).alerts;
    let fresh: Vec<WorkerAlert> = thresholds
        .evaluate(after, now)
        .alerts
        .into_iter()
        .filter(|a| !matches!(a, WorkerAlert::HeartbeatMissed { .. }))
        .filter(|a| !previous.iter().any(|p| same_kind(p, a)))
        .collect();

    for alert in &fresh {
        notes.push(note(alert_type(alert), alert.message(&after.name)));
    }

    (notes, fresh)
}

/// GET /admin/workers
pub async fn index(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Paginated<WorkerStatusView>> {
    let thresholds = state.thresholds().await;
    let now = Utc::now();
    let workers = WorkerRepository::new(state.pool.clone()).list(&page).await?;
    Ok(ApiResponse::ok(workers.map(|w| status_view(w, &thresholds, now))))
}

/// GET /admin/workers/create
pub async fn create_form(State(state): State<AppState>, user: AuthUser) -> ApiResult<WorkerForm> {
    Ok(ApiResponse::ok(form(&state, &user, None)))
}

/// POST /admin/workers
pub async fn store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateWorkerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Worker>>), ApiError> {
    request.validate()?;
    let worker = WorkerRepository::new(state.pool.clone())
        .create(&WorkerInput::from(&request))
        .await?;
    info!(worker_id = worker.id, name = %worker.name, user_id = user.id(), "Worker created");
    Ok(created(worker))
}

/// GET /admin/workers/:id/edit
pub async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<WorkerForm> {
    let worker = WorkerRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Worker not found".into()))?;
    Ok(ApiResponse::ok(form(&state, &user, Some(worker))))
}

/// POST /admin/workers/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateWorkerRequest>,
) -> ApiResult<Worker> {
    request.validate()?;
    let worker = WorkerRepository::new(state.pool.clone())
        .update(id, &WorkerInput::from(&request))
        .await?;
    info!(worker_id = id, user_id = user.id(), "Worker updated");
    Ok(ApiResponse::ok(worker))
}

/// POST /admin/workers/:id/delete
pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    if !WorkerRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Worker not found".into()));
    }
    info!(worker_id = id, user_id = user.id(), "Worker deleted");
    Ok(ApiResponse::ok(json!({ "id": id })))
}

/// Dashboard snapshot: every worker with its health and alerts.
///
/// GET /api/workers/status
pub async fn status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let repo = WorkerRepository::new(state.pool.clone());
    let thresholds = state.thresholds().await;
    let now = Utc::now();

    let workers: Vec<WorkerStatusView> = repo
        .all()
        .await?
        .into_iter()
        .map(|w| status_view(w, &thresholds, now))
        .collect();
    let healthy = workers.iter().filter(|w| w.healthy).count();

    Ok(ApiResponse::ok(StatusResponse {
        summary: StatusSummary {
            total: workers.len(),
            healthy,
            unhealthy: workers.len() - healthy,
            unread_notifications: repo.unread_notification_count().await?,
        },
        workers,
        thresholds: thresholds.into(),
        generated_at: now,
    }))
}

/// Heartbeat counts per bucket for the chart.
///
/// GET /api/workers/heartbeat-history?hours=1|6|24|168
pub async fn heartbeat_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryResponse> {
    let hours = query.hours.unwrap_or(24);
    let window = HistoryWindow::from_hours(hours)
        .ok_or_else(|| ApiError::field("hours", "Hours must be one of 1, 6, 24 or 168"))?;

    let now = Utc::now();
    let since = now - Duration::hours(window.hours());
    let timestamps = WorkerRepository::new(state.pool.clone())
        .heartbeat_times(since, query.worker_id)
        .await?;

    Ok(ApiResponse::ok(HistoryResponse {
        hours: window.hours(),
        worker_id: query.worker_id,
        history: bucket_heartbeats(window, now, &timestamps),
    }))
}

/// Records a worker heartbeat and raises notifications for what changed.
///
/// POST /api/workers/:id/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<HeartbeatRequest>,
) -> ApiResult<WorkerStatusView> {
    request.validate()?;
    let repo = WorkerRepository::new(state.pool.clone());

    let before = repo
        .record_heartbeat(id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound("Worker not found".into()))?;
    let after = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Worker not found".into()))?;

    let thresholds = state.thresholds().await;
    let now = Utc::now();
    let (notes, alerts) = heartbeat_transitions(&before, &after, &thresholds, now);

    for note in &notes {
        if let Err(e) = repo.insert_notification(note).await {
            warn!(worker_id = id, error = %e, "Failed to store worker notification");
        }
    }
    for alert in alerts {
        let notification = WorkerResourceAlert {
            worker_id: after.id,
            worker_name: after.name.clone(),
            alert,
        };
        state.notifier.notify_admins(&notification).await;
    }

    Ok(ApiResponse::ok(status_view(after, &thresholds, now)))
}

/// GET /admin/workers/notifications
pub async fn notifications(
    State(state): State<AppState>,
    Query(query): Query<WorkerNotificationQuery>,
) -> ApiResult<Paginated<WorkerNotification>> {
    let page = WorkerRepository::new(state.pool.clone())
        .list_notifications(&query)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// POST /admin/workers/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    if !WorkerRepository::new(state.pool.clone())
        .mark_notification_read(id)
        .await?
    {
        return Err(ApiError::NotFound("Notification not found".into()));
    }
    Ok(ApiResponse::ok(json!({ "id": id })))
}

/// POST /admin/workers/notifications/read-all
pub async fn mark_all_notifications_read(State(state): State<AppState>) -> ApiResult<Value> {
    let updated = WorkerRepository::new(state.pool.clone())
        .mark_all_notifications_read()
        .await?;
    Ok(ApiResponse::ok(json!({ "updated": updated })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(status: WorkerStatus, cpu: Option<f64>, failed: i64) -> Worker {
        let now = Utc::now();
        Worker {
            id: 7,
            name: "render-01".into(),
            kind: WorkerKind::Automated,
            email: None,
            status,
            cpu_usage: cpu,
            memory_usage: Some(20.0),
            last_heartbeat: Some(now),
            tasks_completed: 100,
            tasks_failed: failed,
            created_at: now,
            updated_at: now,
        }
    }

    fn kinds(notes: &[NewWorkerNotification]) -> Vec<WorkerNotificationType> {
        notes.iter().map(|n| n.notification_type).collect()
    }

    #[test]
    fn test_steady_heartbeat_is_quiet() {
        let before = worker(WorkerStatus::Active, Some(10.0), 0);
        let after = worker(WorkerStatus::Active, Some(12.0), 0);
        let (notes, alerts) = heartbeat_transitions(&before, &after, &MonitoringThresholds::default(), Utc::now());
        assert!(notes.is_empty());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_recovery_from_offline() {
        let before = worker(WorkerStatus::Offline, Some(10.0), 0);
        let after = worker(WorkerStatus::Active, Some(10.0), 0);
        let (notes, _) = heartbeat_transitions(&before, &after, &MonitoringThresholds::default(), Utc::now());
        assert_eq!(kinds(&notes), vec![WorkerNotificationType::Recovered]);
    }

    #[test]
    fn test_status_change() {
        let before = worker(WorkerStatus::Active, None, 0);
        let after = worker(WorkerStatus::Idle, None, 0);
        let (notes, _) = heartbeat_transitions(&before, &after, &MonitoringThresholds::default(), Utc::now());
        assert_eq!(kinds(&notes), vec![WorkerNotificationType::StatusChanged]);
        assert!(notes[0].message.contains("from active to idle"));
    }

    #[test]
    fn test_new_cpu_alert_is_reported_once() {
        let thresholds = MonitoringThresholds::default();
        let calm = worker(WorkerStatus::Active, Some(20.0), 0);
        let hot = worker(WorkerStatus::Active, Some(97.0), 0);

        let (notes, alerts) = heartbeat_transitions(&calm, &hot, &thresholds, Utc::now());
        assert_eq!(kinds(&notes), vec![WorkerNotificationType::HighCpu]);
        assert_eq!(alerts.len(), 1);

        let (notes, alerts) = heartbeat_transitions(&hot, &hot, &thresholds, Utc::now());
        assert!(notes.is_empty());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_failed_tasks_are_reported() {
        let before = worker(WorkerStatus::Active, None, 1);
        let after = worker(WorkerStatus::Active, None, 3);
        let (notes, _) = heartbeat_transitions(&before, &after, &MonitoringThresholds::default(), Utc::now());
        assert_eq!(kinds(&notes), vec![WorkerNotificationType::TaskFailed]);
        assert!(notes[0].message.contains("2 failed"));
    }
}
