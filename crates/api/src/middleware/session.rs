//! Session loading, route guards and CSRF validation.

use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use domain::services::security_events;
use persistence::repositories::{SessionRepository, UserRepository};
use shared::crypto::{hmac_sha256_hex, sha256_hex, verify_hmac_sha256_hex};
use shared::csrf::{verify_token, CSRF_HEADER};
use tracing::{debug, error};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{client_ip, SessionContext};

/// Header workers authenticate heartbeats with.
pub const WORKER_TOKEN_HEADER: &str = "X-Worker-Token";

/// Resolves the session cookie into a [`SessionContext`] extension.
///
/// Requests without a cookie never touch the database. Lookup failures are
/// logged and the request continues anonymously.
pub async fn load_session(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let token_hash = state
        .cookies
        .extract_session_token(req.headers())
        .map(sha256_hex);

    if let Some(token_hash) = token_hash {
        match resolve(&state, &token_hash).await {
            Ok(Some(context)) => {
                req.extensions_mut().insert(context);
            }
            Ok(None) => debug!("Session cookie did not match an active session"),
            Err(e) => error!(error = %e, "Failed to load session"),
        }
    }

    next.run(req).await
}

async fn resolve(state: &AppState, token_hash: &str) -> Result<Option<SessionContext>, sqlx::Error> {
    let Some(session) = SessionRepository::new(state.pool.clone())
        .find_active(token_hash)
        .await?
    else {
        return Ok(None);
    };
    if session.is_expired(Utc::now()) {
        return Ok(None);
    }

    let user = match session.user_id {
        Some(user_id) => UserRepository::new(state.pool.clone()).find_by_id(user_id).await?,
        None => None,
    };

    Ok(Some(SessionContext {
        session,
        token_hash: token_hash.to_string(),
        user,
    }))
}

/// Route layer for `auth` routes: 401 without a logged-in user, 403 for
/// viewers on anything but GET.
pub async fn require_auth(req: Request<Body>, next: Next) -> Response {
    let role = req
        .extensions()
        .get::<SessionContext>()
        .and_then(|c| c.user.as_ref())
        .map(|u| u.role);

    match role {
        None => ApiError::Unauthorized("Login required".into()).into_response(),
        Some(role) if !role.can_write() && req.method() != Method::GET && req.method() != Method::HEAD => {
            ApiError::Forbidden("Your role is read-only".into()).into_response()
        }
        Some(_) => next.run(req).await,
    }
}

/// Route layer for `csrf` routes: the `X-CSRF-Token` header must carry the
/// token bound to the current session. Failures are logged as security events.
pub async fn verify_csrf(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let session_id = req
        .extensions()
        .get::<SessionContext>()
        .map(|c| c.token_hash.clone());
    let submitted = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Err(e) = verify_token(
        &state.config.security.csrf_secret,
        session_id.as_deref(),
        submitted.as_deref(),
    ) {
        let ip = client_ip(&req)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".into());
        let path = req.uri().path().to_string();
        debug!(reason = %e, path = %path, "CSRF validation failed");
        state
            .security_log
            .record(security_events::csrf_failed(&ip, &path))
            .await;
        return ApiError::from(e).into_response();
    }

    next.run(req).await
}

/// Route layer for the worker heartbeat endpoint.
///
/// The configured token is compared through an HMAC so timing does not leak
/// it; an empty token disables the endpoint.
pub async fn require_worker_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected = &state.config.workers.api_token;
    if expected.is_empty() {
        return ApiError::ServiceUnavailable("Worker heartbeats are not configured".into()).into_response();
    }

    let submitted = req
        .headers()
        .get(WORKER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let key = state.config.security.csrf_secret.as_bytes();
    let expected_tag = hmac_sha256_hex(key, expected.as_bytes());
    if !verify_hmac_sha256_hex(key, submitted.as_bytes(), &expected_tag) {
        return ApiError::Unauthorized("Invalid worker token".into()).into_response();
    }

    next.run(req).await
}
