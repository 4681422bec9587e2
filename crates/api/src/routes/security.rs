//! Security log viewer and IP block management.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use domain::models::security_log::{
    event_types, BlockIpRequest, SecurityLogFilter, SecurityLogPage, SecurityLogQuery, SecurityLogStats,
    StatsQuery, CSV_HEADER, EXPORT_ROW_LIMIT,
};
use domain::models::BlockedIp;
use domain::services::{security_events, SecurityEventBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use shared::pagination::PageRequest;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::{AuthUser, ClientInfo};
use crate::routes::csrf_for;

/// Manual blocks without a duration last a day.
const DEFAULT_BLOCK_MINUTES: i64 = 24 * 60;

#[derive(Debug, Serialize)]
pub struct BlockedIpList {
    pub csrf_token: String,
    pub blocked_ips: Vec<BlockedIp>,
}

/// GET /admin/security/logs
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<SecurityLogQuery>,
) -> ApiResult<SecurityLogPage> {
    let filter = SecurityLogFilter::from(&query);
    let page = PageRequest {
        page: query.page,
        per_page: query.per_page,
    };
    let events = state.security_log.repository().list(&filter, &page).await?;
    Ok(ApiResponse::ok(SecurityLogPage::from(events)))
}

/// GET /admin/security/logs/stats
pub async fn stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> ApiResult<SecurityLogStats> {
    let stats = state
        .security_log
        .repository()
        .stats(query.days(), Utc::now())
        .await?;
    Ok(ApiResponse::ok(stats))
}

/// Filtered log as a CSV download.
///
/// GET /admin/security/logs/export
pub async fn export(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SecurityLogQuery>,
) -> Result<Response, ApiError> {
    let filter = SecurityLogFilter::from(&query);
    let events = state
        .security_log
        .repository()
        .export(&filter, EXPORT_ROW_LIMIT)
        .await?;

    let mut body = String::with_capacity(events.len() * 128 + CSV_HEADER.len() + 1);
    body.push_str(CSV_HEADER);
    body.push('\n');
    for event in &events {
        body.push_str(&event.to_csv_row());
        body.push('\n');
    }

    info!(user_id = user.id(), rows = events.len(), "Security log exported");

    let filename = format!("security-logs-{}.csv", Utc::now().format("%Y%m%d-%H%M%S"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response())
}

/// GET /admin/security/blocked-ips
pub async fn blocked_ips(State(state): State<AppState>, user: AuthUser) -> ApiResult<BlockedIpList> {
    let blocked_ips = state.security_log.repository().blocked_ips().await?;
    Ok(ApiResponse::ok(BlockedIpList {
        csrf_token: csrf_for(&state, &user),
        blocked_ips,
    }))
}

/// Blocks an address by hand. Admins cannot block the address they are
/// connecting from.
///
/// POST /admin/security/blocked-ips
pub async fn block_ip(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(request): Json<BlockIpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BlockedIp>>), ApiError> {
    user.require_admin()?;
    request.validate()?;

    let ip = request.ip_address.trim().to_string();
    if ip == client.ip_string() {
        return Err(ApiError::field("ip_address", "You cannot block your own address"));
    }

    let until = if request.permanent {
        None
    } else {
        let minutes = request.duration_minutes.unwrap_or(DEFAULT_BLOCK_MINUTES);
        Some(Utc::now() + Duration::minutes(minutes))
    };
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Blocked by administrator");

    let blocked = state
        .security_log
        .repository()
        .block(&ip, Some(reason), Some(user.id()), until, request.permanent)
        .await?;
    state
        .security_log
        .record(security_events::ip_blocked(&ip, reason, Some(user.id())))
        .await;

    Ok(created(blocked))
}

/// POST /admin/security/blocked-ips/:id/delete
pub async fn unblock_ip(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    user.require_admin()?;
    let removed = state
        .security_log
        .repository()
        .unblock(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blocked IP not found".into()))?;

    state
        .security_log
        .record(
            SecurityEventBuilder::new(event_types::IP_UNBLOCKED)
                .user(user.id())
                .ip(client.ip_string())
                .details(format!("Unblocked {}", removed.ip_address))
                .meta("unblocked_ip", removed.ip_address.clone())
                .build(),
        )
        .await;

    Ok(ApiResponse::ok(json!({ "id": id, "ip_address": removed.ip_address })))
}
