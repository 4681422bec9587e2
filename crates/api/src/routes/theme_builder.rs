//! Theme builder admin: module palette, live preview, pages and theme settings.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::page::SavePageRequest;
use domain::models::Page;
use persistence::repositories::{PageInput, PageRepository, SettingRepository};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::pagination::{PageRequest, Paginated};
use theme_builder::{Attrs, Layout, LayoutRenderer, RenderOutput, RenderedModule, ThemeSettings};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult, ValidationDetail};
use crate::extractors::AuthUser;
use crate::routes::csrf_for;

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub layout: Value,
}

#[derive(Debug, Deserialize)]
pub struct RenderModuleRequest {
    #[serde(rename = "type")]
    pub slug: String,
    #[serde(default)]
    pub attrs: Value,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PageForm {
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

#[derive(Debug, Serialize)]
pub struct ThemeSettingsResponse {
    pub csrf_token: String,
    pub settings: BTreeMap<&'static str, String>,
    pub css: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThemeSettingsRequest {
    pub settings: BTreeMap<String, String>,
}

fn theme_response(state: &AppState, user: &AuthUser, theme: &ThemeSettings) -> ThemeSettingsResponse {
    ThemeSettingsResponse {
        csrf_token: csrf_for(state, user),
        settings: theme.effective().into_iter().collect(),
        css: theme.to_css(),
    }
}

async fn load_theme(state: &AppState) -> Result<ThemeSettings, ApiError> {
    let stored = SettingRepository::new(state.pool.clone()).theme_overrides().await?;
    Ok(ThemeSettings::from_pairs(stored))
}

fn page_input(request: &SavePageRequest) -> PageInput {
    PageInput {
        title: request.title.trim().to_string(),
        slug: request.resolved_slug(),
        content: request.content(),
        status: request.status,
    }
}

async fn ensure_slug_free(repo: &PageRepository, slug: &str, except: Option<i64>) -> Result<(), ApiError> {
    if repo.slug_taken(slug, except).await? {
        return Err(ApiError::Conflict(format!("Slug '{}' is already in use", slug)));
    }
    Ok(())
}

/// GET /admin/theme-builder/modules
pub async fn modules(State(state): State<AppState>) -> ApiResult<Vec<Value>> {
    Ok(ApiResponse::ok(state.registry.describe()))
}

/// GET /admin/theme-builder/modules/:slug
pub async fn module(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Value> {
    state
        .registry
        .describe()
        .into_iter()
        .find(|m| m["slug"] == slug.as_str())
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown module type: {}", slug)))
}

/// Renders a whole layout for the builder preview.
///
/// POST /admin/theme-builder/render
pub async fn render(State(state): State<AppState>, Json(request): Json<RenderRequest>) -> ApiResult<RenderOutput> {
    let layout = Layout::from_value(request.layout)?;
    let output = LayoutRenderer::new(&state.registry).render(&layout);
    Ok(ApiResponse::ok(output))
}

/// POST /admin/theme-builder/render-module
pub async fn render_module(
    State(state): State<AppState>,
    Json(request): Json<RenderModuleRequest>,
) -> ApiResult<RenderedModule> {
    let attrs = match request.attrs {
        Value::Null => Attrs::new(),
        value => Attrs::from_value(value)?,
    };
    Ok(ApiResponse::ok(
        state.registry.render_module(&request.slug, &attrs, &request.content),
    ))
}

/// GET /admin/theme-builder/pages
pub async fn pages(State(state): State<AppState>, Query(page): Query<PageRequest>) -> ApiResult<Paginated<Page>> {
    let pages = PageRepository::new(state.pool.clone()).list(&page).await?;
    Ok(ApiResponse::ok(pages))
}

/// GET /admin/theme-builder/pages/create
pub async fn create_page_form(State(state): State<AppState>, user: AuthUser) -> ApiResult<PageForm> {
    Ok(ApiResponse::ok(PageForm {
        csrf_token: csrf_for(&state, &user),
        page: None,
    }))
}

/// POST /admin/theme-builder/pages
pub async fn store_page(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SavePageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Page>>), ApiError> {
    request.validate()?;
    let input = page_input(&request);
    let repo = PageRepository::new(state.pool.clone());
    ensure_slug_free(&repo, &input.slug, None).await?;
    let page = repo.create(&input).await?;

    info!(page_id = page.id, slug = %page.slug, user_id = user.id(), "Page created");
    Ok(created(page))
}

/// GET /admin/theme-builder/pages/:id/edit
pub async fn edit_page(State(state): State<AppState>, user: AuthUser, Path(id): Path<i64>) -> ApiResult<PageForm> {
    let page = PageRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Page not found".into()))?;
    Ok(ApiResponse::ok(PageForm {
        csrf_token: csrf_for(&state, &user),
        page: Some(page),
    }))
}

/// Saves the page and drops its cached stylesheet.
///
/// POST /admin/theme-builder/pages/:id
pub async fn update_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<SavePageRequest>,
) -> ApiResult<Page> {
    request.validate()?;
    let input = page_input(&request);
    let repo = PageRepository::new(state.pool.clone());
    ensure_slug_free(&repo, &input.slug, Some(id)).await?;
    let page = repo
        .update(id, &input)
        .await?
        .ok_or_else(|| ApiError::NotFound("Page not found".into()))?;

    info!(page_id = id, user_id = user.id(), "Page updated");
    Ok(ApiResponse::ok(page))
}

/// POST /admin/theme-builder/pages/:id/delete
pub async fn destroy_page(State(state): State<AppState>, user: AuthUser, Path(id): Path<i64>) -> ApiResult<Value> {
    if !PageRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Page not found".into()));
    }
    info!(page_id = id, user_id = user.id(), "Page deleted");
    Ok(ApiResponse::ok(json!({ "id": id })))
}

/// GET /admin/theme-builder/settings
pub async fn settings(State(state): State<AppState>, user: AuthUser) -> ApiResult<ThemeSettingsResponse> {
    let theme = load_theme(&state).await?;
    Ok(ApiResponse::ok(theme_response(&state, &user, &theme)))
}

/// Applies the submitted overrides on top of the stored ones.
///
/// Every cached page stylesheet is dropped since pages embed the theme
/// variables.
///
/// POST /admin/theme-builder/settings
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateThemeSettingsRequest>,
) -> ApiResult<ThemeSettingsResponse> {
    let mut theme = load_theme(&state).await?;
    let errors: Vec<ValidationDetail> = request
        .settings
        .iter()
        .filter_map(|(key, value)| {
            theme
                .set(key, value)
                .err()
                .map(|e| ValidationDetail::new(key.clone(), e.to_string()))
        })
        .collect();
    if !errors.is_empty() {
        return Err(ApiError::ValidationDetails(errors));
    }

    let pairs: Vec<(String, String)> = ThemeSettings::keys()
        .filter_map(|key| {
            let value = theme.get(key);
            (Some(value) != ThemeSettings::default_for(key)).then(|| (key.to_string(), value.to_string()))
        })
        .collect();

    SettingRepository::new(state.pool.clone()).save_theme(&pairs).await?;
    let cleared = PageRepository::new(state.pool.clone()).clear_css_cache().await?;

    info!(user_id = user.id(), overrides = pairs.len(), cleared, "Theme settings updated");
    Ok(ApiResponse::ok(theme_response(&state, &user, &theme)))
}
