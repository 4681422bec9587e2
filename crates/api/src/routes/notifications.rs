//! Admin notification center.
//!
//! Merges the `notifications` table with the in-memory broadcast log
//! ("queue" entries). Entry ids carry their source: `db_{id}` or `queue_{seq}`.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use domain::models::notification::{CenterEntry, CenterFilter, EntrySource, NotificationCenterQuery};
use domain::services::notification_center::{build_page, stored_rows_needed, CenterPage, StoredMatches};
use persistence::repositories::NotificationRepository;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, Stream, StreamExt};
use tracing::debug;

use crate::app::AppState;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extractors::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryRef {
    Database(i64),
    Queue(u64),
}

fn parse_entry_id(id: &str) -> Option<EntryRef> {
    if let Some(raw) = id.strip_prefix("db_") {
        return raw.parse().ok().map(EntryRef::Database);
    }
    if let Some(raw) = id.strip_prefix("queue_") {
        return raw.parse().ok().map(EntryRef::Queue);
    }
    // bare numbers address stored notifications
    id.parse().ok().map(EntryRef::Database)
}

fn entry_ref(id: &str) -> Result<EntryRef, ApiError> {
    parse_entry_id(id).ok_or_else(|| ApiError::NotFound("Notification not found".into()))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub database: i64,
    pub queue: usize,
    pub total: i64,
}

/// Stored notifications are filtered and counted in the database; only the
/// rows the requested page can reach are loaded.
///
/// GET /admin/notifications
pub async fn index(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationCenterQuery>,
) -> ApiResult<CenterPage> {
    let filter = CenterFilter::from(&query);
    let queue = state.broadcasts.recent();

    let stored = if filter.source.includes(EntrySource::Database) {
        let repo = NotificationRepository::new(state.pool.clone());
        let counts = repo.count_matching(user.id(), &filter).await?;
        let limit = stored_rows_needed(&filter, counts.total as usize, &queue);
        let entries: Vec<CenterEntry> = repo
            .list_matching(user.id(), &filter, limit as i64)
            .await?
            .into_iter()
            .map(CenterEntry::from)
            .collect();
        StoredMatches {
            entries,
            total: counts.total as usize,
            unread: counts.unread as usize,
        }
    } else {
        StoredMatches::default()
    };

    Ok(ApiResponse::ok(build_page(stored, queue, filter)))
}

/// GET /admin/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, user: AuthUser) -> ApiResult<UnreadCount> {
    let database = NotificationRepository::new(state.pool.clone())
        .unread_count(user.id())
        .await?;
    let queue = state.broadcasts.unread_count();
    Ok(ApiResponse::ok(UnreadCount {
        database,
        queue,
        total: database + queue as i64,
    }))
}

/// Live broadcast notifications as server-sent events.
///
/// GET /admin/notifications/stream
pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(state.broadcasts.subscribe()).filter_map(|item| match item {
        Ok(event) => Event::default()
            .event(event.event.clone())
            .id(event.seq.to_string())
            .json_data(&event)
            .ok()
            .map(Ok),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "Notification stream subscriber lagged");
            None
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// POST /admin/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let found = match entry_ref(&id)? {
        EntryRef::Database(db_id) => {
            NotificationRepository::new(state.pool.clone())
                .mark_read(db_id, user.id())
                .await?
        }
        EntryRef::Queue(seq) => state.broadcasts.mark_read(seq),
    };
    if !found {
        return Err(ApiError::NotFound("Notification not found".into()));
    }
    Ok(ApiResponse::ok(json!({ "id": id })))
}

/// POST /admin/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let database = NotificationRepository::new(state.pool.clone())
        .mark_all_read(user.id())
        .await?;
    let queue = state.broadcasts.mark_all_read();
    Ok(ApiResponse::ok(json!({ "database": database, "queue": queue })))
}

/// POST /admin/notifications/:id/delete
pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let found = match entry_ref(&id)? {
        EntryRef::Database(db_id) => {
            NotificationRepository::new(state.pool.clone())
                .delete(db_id, user.id())
                .await?
        }
        EntryRef::Queue(seq) => state.broadcasts.remove(seq),
    };
    if !found {
        return Err(ApiError::NotFound("Notification not found".into()));
    }
    Ok(ApiResponse::ok(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_id() {
        assert_eq!(parse_entry_id("db_42"), Some(EntryRef::Database(42)));
        assert_eq!(parse_entry_id("queue_7"), Some(EntryRef::Queue(7)));
        assert_eq!(parse_entry_id("13"), Some(EntryRef::Database(13)));
        assert_eq!(parse_entry_id("queue_x"), None);
        assert_eq!(parse_entry_id("mail_1"), None);
        assert_eq!(parse_entry_id(""), None);
    }
}
