//! Session extractors.
//!
//! `middleware::session::load_session` resolves the cookie once per request
//! and stores a [`SessionContext`] in the extensions; these extractors only
//! read it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::{Session, User};

use crate::error::ApiError;

/// The session behind the request cookie, with its user when logged in.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    /// SHA-256 of the cookie token; also the CSRF binding.
    pub token_hash: String,
    pub user: Option<User>,
}

/// Session if one exists; never rejects.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<SessionContext>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(parts.extensions.get::<SessionContext>().cloned()))
    }
}

/// A logged-in user; 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session: Session,
    pub token_hash: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.role.can_manage_users() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Administrator role required".into()))
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<SessionContext>()
            .ok_or_else(|| ApiError::Unauthorized("Login required".into()))?;
        let user = context
            .user
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("Login required".into()))?;
        Ok(AuthUser {
            user,
            session: context.session.clone(),
            token_hash: context.token_hash.clone(),
        })
    }
}
