//! First administrator bootstrap.
//!
//! Creates an admin from `[admin]` config when the users table is empty.
//! Idempotent: any existing user disables it.

use domain::models::Role;
use persistence::repositories::{UserInput, UserRepository};
use shared::password::{hash_password, PasswordError};
use shared::validation::validate_username;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::AdminBootstrapConfig;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] PasswordError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Returns the id of the created admin, or `None` when nothing was done.
pub async fn bootstrap_admin(
    pool: &PgPool,
    config: &AdminBootstrapConfig,
) -> Result<Option<i64>, BootstrapError> {
    if config.bootstrap_username.is_empty() {
        return Ok(None);
    }

    if config.bootstrap_password.is_empty() {
        warn!("JC__ADMIN__BOOTSTRAP_USERNAME is set but JC__ADMIN__BOOTSTRAP_PASSWORD is empty, skipping bootstrap");
        return Ok(None);
    }

    validate_username(&config.bootstrap_username)
        .map_err(|_| BootstrapError::Config("bootstrap_username is not a valid username".into()))?;

    let users = UserRepository::new(pool.clone());
    if users.count().await? > 0 {
        info!("Users already exist, skipping admin bootstrap");
        return Ok(None);
    }

    let user = users
        .create(&UserInput {
            username: config.bootstrap_username.clone(),
            email: Some(config.bootstrap_email.trim().to_lowercase()).filter(|e| !e.is_empty()),
            role: Role::Admin,
            password_hash: Some(hash_password(&config.bootstrap_password)?),
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "Bootstrapped first administrator");
    Ok(Some(user.id))
}
