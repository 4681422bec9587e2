//! User management. Only administrators reach these handlers' writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::security_log::event_types;
use domain::models::user::{normalize_email, CreateUserRequest, UpdateUserRequest};
use domain::models::{Role, User};
use domain::services::{Recipient, SecurityEventBuilder, UserWelcome};
use persistence::repositories::{UserInput, UserRepository};
use serde::Serialize;
use serde_json::{json, Value};
use shared::pagination::{PageRequest, Paginated};
use shared::password::{check_new_password, hash_password};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::{AuthUser, ClientInfo};
use crate::routes::csrf_for;

#[derive(Debug, Serialize)]
pub struct UserForm {
    pub csrf_token: String,
    pub roles: [Role; 3],
    pub default_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

fn form(state: &AppState, auth: &AuthUser, user: Option<User>) -> UserForm {
    UserForm {
        csrf_token: csrf_for(state, auth),
        roles: [Role::Admin, Role::Editor, Role::Viewer],
        default_role: Role::default(),
        user,
    }
}

async fn ensure_username_free(repo: &UserRepository, username: &str, except: Option<i64>) -> Result<(), ApiError> {
    if repo.username_taken(username, except).await? {
        return Err(ApiError::Conflict(format!("Username '{}' is already taken", username)));
    }
    Ok(())
}

async fn audit(state: &AppState, event_type: &str, actor: &AuthUser, client: &ClientInfo, details: String) {
    state
        .security_log
        .record(
            SecurityEventBuilder::new(event_type)
                .user(actor.id())
                .ip(client.ip_string())
                .user_agent(client.user_agent.as_deref())
                .details(details)
                .build(),
        )
        .await;
}

/// GET /admin/users
pub async fn index(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
) -> ApiResult<Paginated<User>> {
    user.require_admin()?;
    let users = UserRepository::new(state.pool.clone()).list(&page).await?;
    Ok(ApiResponse::ok(users))
}

/// GET /admin/users/create
pub async fn create_form(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserForm> {
    user.require_admin()?;
    Ok(ApiResponse::ok(form(&state, &user, None)))
}

/// Creates an account and sends the welcome notification.
///
/// POST /admin/users
pub async fn store(
    State(state): State<AppState>,
    actor: AuthUser,
    client: ClientInfo,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    actor.require_admin()?;
    request.validate()?;

    let repo = UserRepository::new(state.pool.clone());
    let username = request.username.trim().to_string();
    ensure_username_free(&repo, &username, None).await?;

    let input = UserInput {
        username,
        email: normalize_email(request.email.as_deref()),
        role: request.role,
        password_hash: Some(hash_password(&request.password)?),
    };
    let user = repo.create(&input).await?;

    audit(
        &state,
        event_types::USER_CREATED,
        &actor,
        &client,
        format!("Created user {} ({})", user.username, user.role.as_str()),
    )
    .await;

    let welcome = UserWelcome {
        username: user.username.clone(),
        login_url: state.config.admin_url("/admin/login"),
    };
    state
        .notifier
        .notify(&welcome, Recipient::user(user.id, user.username.clone(), user.email.clone()))
        .await;

    info!(user_id = user.id, username = %user.username, "User created");
    Ok(created(user))
}

/// GET /admin/users/:id/edit
pub async fn edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<UserForm> {
    auth.require_admin()?;
    let user = UserRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(ApiResponse::ok(form(&state, &auth, Some(user))))
}

/// Updates a user inside one transaction. Demoting the last admin is refused.
///
/// POST /admin/users/:id
pub async fn update(
    State(state): State<AppState>,
    actor: AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    actor.require_admin()?;
    request.validate()?;

    let repo = UserRepository::new(state.pool.clone());
    let username = request.username.trim().to_string();
    ensure_username_free(&repo, &username, Some(id)).await?;

    let password_hash = match request.new_password() {
        Some(password) => {
            check_new_password(password, request.password_confirm.as_deref().unwrap_or(""))?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    let password_changed = password_hash.is_some();

    let input = UserInput {
        username,
        email: normalize_email(request.email.as_deref()),
        role: request.role,
        password_hash,
    };
    let user = repo.update(id, &input).await?;

    audit(
        &state,
        event_types::USER_UPDATED,
        &actor,
        &client,
        format!("Updated user {} ({})", user.username, user.role.as_str()),
    )
    .await;
    if password_changed {
        audit(
            &state,
            event_types::PASSWORD_CHANGED,
            &actor,
            &client,
            format!("Password changed for user {}", user.username),
        )
        .await;
    }

    info!(user_id = id, password_changed, "User updated");
    Ok(ApiResponse::ok(user))
}

/// POST /admin/users/:id/delete
pub async fn destroy(
    State(state): State<AppState>,
    actor: AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    actor.require_admin()?;
    if actor.id() == id {
        return Err(ApiError::Validation("You cannot delete your own account".into()));
    }

    let user = UserRepository::new(state.pool.clone()).delete(id).await?;
    audit(
        &state,
        event_types::USER_DELETED,
        &actor,
        &client,
        format!("Deleted user {}", user.username),
    )
    .await;

    info!(user_id = id, username = %user.username, "User deleted");
    Ok(ApiResponse::ok(json!({ "id": id })))
}
