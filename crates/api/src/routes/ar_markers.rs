//! AR marker generator.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::ar_marker::{CreateArMarkerRequest, MarkerImageQuery};
use domain::models::ArMarkerRecord;
use domain::services::ArMarker;
use persistence::repositories::ArMarkerRepository;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::AuthUser;
use crate::routes::csrf_for;

#[derive(Debug, Serialize)]
pub struct MarkerList {
    pub csrf_token: String,
    pub markers: Vec<ArMarkerRecord>,
}

/// GET /admin/ar-markers
pub async fn index(State(state): State<AppState>, user: AuthUser) -> ApiResult<MarkerList> {
    let markers = ArMarkerRepository::new(state.pool.clone()).list().await?;
    Ok(ApiResponse::ok(MarkerList {
        csrf_token: csrf_for(&state, &user),
        markers,
    }))
}

/// Generates (or regenerates) the marker for an entity id.
///
/// POST /admin/ar-markers
pub async fn store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateArMarkerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ArMarkerRecord>>), ApiError> {
    request.validate()?;
    let pattern = ArMarker::generate(request.entity_id)?;
    let marker = ArMarkerRepository::new(state.pool.clone())
        .upsert(request.entity_id, &pattern)
        .await?;

    info!(marker_id = marker.id, entity_id = marker.entity_id, user_id = user.id(), "AR marker generated");
    Ok(created(marker))
}

/// Marker as a PNG, `?size=` pixels wide.
///
/// GET /admin/ar-markers/:id/image
pub async fn image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MarkerImageQuery>,
) -> Result<Response, ApiError> {
    let marker = ArMarkerRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Marker not found".into()))?;

    let png = ArMarker::render_png(&marker.pattern, query.size())?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"ar-marker-{}.png\"", marker.entity_id),
            ),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        png,
    )
        .into_response())
}

/// POST /admin/ar-markers/:id/delete
pub async fn destroy(State(state): State<AppState>, user: AuthUser, Path(id): Path<i64>) -> ApiResult<Value> {
    if !ArMarkerRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Marker not found".into()));
    }
    info!(marker_id = id, user_id = user.id(), "AR marker deleted");
    Ok(ApiResponse::ok(json!({ "id": id })))
}
