//! Site settings form.

use axum::{extract::State, Json};
use domain::models::security_log::event_types;
use domain::models::setting::{effective_settings, validate_updates, SettingError, SettingView, UpdateSettingsRequest};
use domain::services::SecurityEventBuilder;
use persistence::repositories::SettingRepository;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::{ApiError, ApiResponse, ApiResult, ValidationDetail};
use crate::extractors::{AuthUser, ClientInfo};
use crate::routes::csrf_for;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub csrf_token: String,
    pub settings: Vec<SettingView>,
}

fn details(errors: Vec<SettingError>) -> ApiError {
    ApiError::ValidationDetails(
        errors
            .into_iter()
            .map(|err| match &err {
                SettingError::UnknownKey(key) => ValidationDetail::new(key.clone(), err.to_string()),
                SettingError::Invalid { key, .. } => ValidationDetail::new(key.clone(), err.to_string()),
            })
            .collect(),
    )
}

/// GET /admin/settings
pub async fn show(State(state): State<AppState>, user: AuthUser) -> ApiResult<SettingsResponse> {
    let stored = SettingRepository::new(state.pool.clone()).all().await?;
    Ok(ApiResponse::ok(SettingsResponse {
        csrf_token: csrf_for(&state, &user),
        settings: effective_settings(&stored),
    }))
}

/// Validates every submitted value against the catalogue, then saves them
/// together. One bad value rejects the whole form.
///
/// POST /admin/settings
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<SettingsResponse> {
    if request.settings.is_empty() {
        return Err(ApiError::field("settings", "No settings submitted"));
    }
    let accepted = validate_updates(&request.settings).map_err(details)?;

    let repo = SettingRepository::new(state.pool.clone());
    repo.save_many(&accepted).await?;

    let keys: Vec<&str> = accepted.iter().map(|(def, _)| def.key).collect();
    state
        .security_log
        .record(
            SecurityEventBuilder::new(event_types::SETTINGS_CHANGED)
                .user(user.id())
                .ip(client.ip_string())
                .user_agent(client.user_agent.as_deref())
                .details(format!("Updated settings: {}", keys.join(", ")))
                .meta("keys", keys.clone())
                .build(),
        )
        .await;
    info!(user_id = user.id(), count = keys.len(), "Settings updated");

    let stored = repo.all().await?;
    Ok(ApiResponse::ok(SettingsResponse {
        csrf_token: csrf_for(&state, &user),
        settings: effective_settings(&stored),
    }))
}
