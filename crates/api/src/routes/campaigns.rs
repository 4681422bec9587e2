//! Email campaigns and the outgoing mail queue.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::email_campaign::{
    plan_deliveries, CreateCampaignRequest, EmailQueueQuery, QueueCounts, SendCampaignRequest,
};
use domain::models::{EmailCampaign, QueuedEmail};
use domain::services::CampaignQueued;
use persistence::repositories::{CampaignRepository, EmailQueueRepository};
use serde::Serialize;
use serde_json::{json, Value};
use shared::pagination::{PageRequest, Paginated};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::AuthUser;
use crate::routes::csrf_for;

#[derive(Debug, Serialize)]
pub struct CampaignList {
    pub csrf_token: String,
    #[serde(flatten)]
    pub campaigns: Paginated<EmailCampaign>,
}

#[derive(Debug, Serialize)]
pub struct QueueList {
    pub csrf_token: String,
    pub counts: QueueCounts,
    #[serde(flatten)]
    pub emails: Paginated<QueuedEmail>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub campaign_id: i64,
    pub queued: usize,
    pub invalid: usize,
    pub test: bool,
}

async fn find_campaign(repo: &CampaignRepository, id: i64) -> Result<EmailCampaign, ApiError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Campaign not found".into()))
}

/// GET /admin/email-campaigns
pub async fn index(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
) -> ApiResult<CampaignList> {
    let campaigns = CampaignRepository::new(state.pool.clone()).list(&page).await?;
    Ok(ApiResponse::ok(CampaignList {
        csrf_token: csrf_for(&state, &user),
        campaigns,
    }))
}

/// Saves a campaign draft. Language and email count are normalized.
///
/// POST /admin/email-campaigns
pub async fn store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EmailCampaign>>), ApiError> {
    request.validate()?;
    let campaign = CampaignRepository::new(state.pool.clone())
        .create(&request.normalize())
        .await?;

    info!(campaign_id = campaign.id, emails = campaign.emails.len(), user_id = user.id(), "Campaign created");
    Ok(created(campaign))
}

/// GET /admin/email-campaigns/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<EmailCampaign> {
    let campaign = find_campaign(&CampaignRepository::new(state.pool.clone()), id).await?;
    Ok(ApiResponse::ok(campaign))
}

/// Queues the campaign for every valid recipient.
///
/// A test send queues a single `[TEST]` email immediately and leaves the
/// campaign status alone.
///
/// POST /admin/email-campaigns/:id/send
pub async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<SendCampaignRequest>,
) -> ApiResult<SendResponse> {
    request.validate()?;
    let repo = CampaignRepository::new(state.pool.clone());
    let campaign = find_campaign(&repo, id).await?;

    let (recipients, invalid) = request.partition_recipients();
    if recipients.is_empty() {
        return Err(ApiError::field("recipients", "No valid recipient addresses"));
    }
    if campaign.emails.is_empty() {
        return Err(ApiError::Validation("Campaign has no emails to send".into()));
    }

    let test = request.test_email_index.is_some();
    let rows = plan_deliveries(
        &campaign,
        &recipients,
        &state.config.email.sender_email,
        request.test_email_index,
        Utc::now(),
    );
    let queued = repo.enqueue(campaign.id, &rows, !test).await?;

    state
        .notifier
        .notify_admins(&CampaignQueued {
            campaign_id: campaign.id,
            campaign_name: campaign.name.clone(),
            queued,
            invalid,
        })
        .await;

    info!(campaign_id = id, queued, invalid, test, user_id = user.id(), "Campaign queued");
    Ok(ApiResponse::ok(SendResponse {
        campaign_id: id,
        queued,
        invalid,
        test,
    }))
}

/// POST /admin/email-campaigns/:id/delete
pub async fn destroy(State(state): State<AppState>, user: AuthUser, Path(id): Path<i64>) -> ApiResult<Value> {
    if !CampaignRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Campaign not found".into()));
    }
    info!(campaign_id = id, user_id = user.id(), "Campaign deleted");
    Ok(ApiResponse::ok(json!({ "id": id })))
}

/// GET /admin/email-queue
pub async fn queue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EmailQueueQuery>,
) -> ApiResult<QueueList> {
    let repo = EmailQueueRepository::new(state.pool.clone());
    let emails = repo.list(&query).await?;
    let counts = repo.counts().await?;
    Ok(ApiResponse::ok(QueueList {
        csrf_token: csrf_for(&state, &user),
        counts,
        emails,
    }))
}

/// Puts a pending or failed email back in line. Sent emails stay sent.
///
/// POST /admin/email-queue/:id/retry
pub async fn retry(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<QueuedEmail> {
    let repo = EmailQueueRepository::new(state.pool.clone());
    let email = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Queued email not found".into()))?;
    if !email.can_retry() {
        return Err(ApiError::Conflict("Email has already been sent".into()));
    }

    let email = repo
        .retry(id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Email has already been sent".into()))?;
    info!(email_id = id, "Queued email reset for retry");
    Ok(ApiResponse::ok(email))
}

/// POST /admin/email-queue/:id/delete
pub async fn queue_destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    if !EmailQueueRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Queued email not found".into()));
    }
    Ok(ApiResponse::ok(json!({ "id": id })))
}
