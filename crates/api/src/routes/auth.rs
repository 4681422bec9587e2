//! Admin session routes: login form, login, logout and the session probe.

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use domain::models::security_log::event_types;
use domain::models::session::NewSession;
use domain::models::user::{LoginRequest, SessionUser};
use domain::services::SecurityEventBuilder;
use persistence::repositories::{SessionRepository, UserRepository};
use serde::Serialize;
use shared::crypto::{generate_token, sha256_hex};
use shared::password::verify_password;
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::{ApiError, ApiResponse};
use crate::extractors::{AuthUser, ClientInfo, CurrentSession};
use crate::routes::{csrf_for, csrf_token};

/// Bytes of entropy in a session cookie token.
const SESSION_TOKEN_BYTES: usize = 32;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Serialize)]
pub struct LoginFormResponse {
    pub csrf_token: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub csrf_token: String,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub redirect: &'static str,
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "on" | "true" | "yes"))
}

/// Boots the login form.
///
/// Reuses the visitor's session when one exists; otherwise starts an
/// anonymous session so the form has a CSRF token to submit.
///
/// GET /admin/login
pub async fn login_form(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    client: ClientInfo,
) -> Result<(HeaderMap, Json<ApiResponse<LoginFormResponse>>), ApiError> {
    let mut headers = HeaderMap::new();

    if let Some(context) = current {
        return Ok((
            headers,
            ApiResponse::ok(LoginFormResponse {
                csrf_token: csrf_token(&state, &context.token_hash),
                authenticated: context.user.is_some(),
            }),
        ));
    }

    let token = generate_token(SESSION_TOKEN_BYTES);
    let token_hash = sha256_hex(&token);
    let ttl = state.config.session.ttl_secs;
    let session = NewSession::new(token_hash.clone(), Duration::seconds(ttl))
        .with_client(Some(client.ip_string()), client.user_agent.clone());
    SessionRepository::new(state.pool.clone()).create(&session).await?;
    state.cookies.add_session_cookie(&mut headers, &token, ttl);

    Ok((
        headers,
        ApiResponse::ok(LoginFormResponse {
            csrf_token: csrf_token(&state, &token_hash),
            authenticated: false,
        }),
    ))
}

/// Verifies credentials and rotates the session.
///
/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    client: ClientInfo,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<LoginResponse>>), ApiError> {
    request.validate()?;
    let ip = client.ip_string();
    let user_agent = client.user_agent.as_deref();

    if let Some(block) = state.security_log.active_block(&ip).await {
        state
            .security_log
            .record(
                SecurityEventBuilder::new(event_types::BLOCKED_IP_REJECTED)
                    .severity(domain::models::Severity::Warning)
                    .ip(ip.as_str())
                    .user_agent(user_agent)
                    .details(format!("Login refused for blocked IP (block #{})", block.id))
                    .build(),
            )
            .await;
        return Err(ApiError::Forbidden("Access from this address is blocked".into()));
    }

    let users = UserRepository::new(state.pool.clone());
    let username = request.username.trim();
    let user = users.find_by_username(username).await?;

    let verified = match &user {
        Some(user) => match verify_password(&request.password, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Stored password hash could not be checked");
                false
            }
        },
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            let outcome = state.security_log.login_failed(username, &ip, user_agent).await;
            if outcome.blocked {
                return Err(ApiError::Forbidden("Access from this address is blocked".into()));
            }
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let ttl = if is_checked(request.remember.as_deref()) {
        state.config.session.remember_ttl_secs
    } else {
        state.config.session.ttl_secs
    };
    let token = generate_token(SESSION_TOKEN_BYTES);
    let token_hash = sha256_hex(&token);
    let new_session = NewSession::new(token_hash.clone(), Duration::seconds(ttl))
        .for_user(user.id)
        .with_client(Some(ip.clone()), client.user_agent.clone());

    let old_hash = current.as_ref().map(|c| c.token_hash.as_str());
    SessionRepository::new(state.pool.clone())
        .rotate(old_hash, &new_session)
        .await?;
    users.record_login(user.id).await?;
    state
        .security_log
        .login_succeeded(user.id, &user.username, &ip, user_agent)
        .await;

    info!(user_id = user.id, username = %user.username, "Admin logged in");

    let mut headers = HeaderMap::new();
    state.cookies.add_session_cookie(&mut headers, &token, ttl);

    Ok((
        headers,
        ApiResponse::ok(LoginResponse {
            user: SessionUser::from(&user),
            csrf_token: csrf_token(&state, &token_hash),
            redirect: request.safe_redirect().to_string(),
        }),
    ))
}

/// Ends the session and clears the cookie.
///
/// GET /admin/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
) -> Result<(HeaderMap, Json<ApiResponse<LogoutResponse>>), ApiError> {
    SessionRepository::new(state.pool.clone())
        .delete(&user.token_hash)
        .await?;
    state
        .security_log
        .record(
            SecurityEventBuilder::new(event_types::LOGOUT)
                .user(user.id())
                .ip(client.ip_string())
                .user_agent(client.user_agent.as_deref())
                .build(),
        )
        .await;

    info!(user_id = user.id(), "Admin logged out");

    let mut headers = HeaderMap::new();
    state.cookies.add_clear_cookie(&mut headers);
    Ok((headers, ApiResponse::ok(LogoutResponse { redirect: "/admin/login" })))
}

/// GET /admin/session
pub async fn session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<ApiResponse<SessionResponse>> {
    ApiResponse::ok(SessionResponse {
        csrf_token: csrf_for(&state, &user),
        expires_at: user.session.expires_at,
        user: SessionUser::from(&user.user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_checkbox_values() {
        assert!(is_checked(Some("1")));
        assert!(is_checked(Some("on")));
        assert!(!is_checked(Some("0")));
        assert!(!is_checked(None));
    }
}
