//! User and session repositories.

use chrono::{DateTime, Utc};
use domain::models::session::NewSession;
use domain::models::{Role, Session, User};
use shared::pagination::{PageRequest, Paginated};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::entities::{SessionEntity, UserEntity};
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, last_login, created_at, updated_at";

/// Failures of user writes that guard the admin invariants.
#[derive(Debug, Error)]
pub enum UserWriteError {
    #[error("User not found")]
    NotFound,

    #[error("The last administrator cannot be removed or demoted")]
    LastAdmin,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Fields written on create and update.
#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    /// `None` keeps the stored hash on update.
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<User>, sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let query = format!(
            "SELECT {} FROM users ORDER BY username LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserEntity>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Case-insensitive lookup used by login.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_username");
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserEntity>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        timer.record();
        Ok(row.map(Into::into))
    }

    pub async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(username) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    /// Admins that have an email address, for notification fan-out.
    pub async fn admins_with_email(&self) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE role = 'admin' AND email IS NOT NULL ORDER BY id",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserEntity>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn create(&self, input: &UserInput) -> Result<User, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserEntity>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(input.password_hash.as_deref().unwrap_or_default())
            .bind(input.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        timer.record();
        Ok(row.into())
    }

    /// Other admins besides `user_id`, counted under a row lock.
    async fn other_admins(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<i64, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM users WHERE role = 'admin' AND id <> $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids.len() as i64)
    }

    async fn current_role(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<Role, UserWriteError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
        role.ok_or(UserWriteError::NotFound)
            .map(|r| r.parse().unwrap_or(Role::Viewer))
    }

    /// Updates a user; demoting the last admin is refused.
    pub async fn update(&self, id: i64, input: &UserInput) -> Result<User, UserWriteError> {
        let timer = QueryTimer::new("update_user");
        let mut tx = self.pool.begin().await?;

        let role = Self::current_role(&mut tx, id).await?;
        if role == Role::Admin && input.role != Role::Admin && Self::other_admins(&mut tx, id).await? == 0 {
            return Err(UserWriteError::LastAdmin);
        }

        let query = format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, role = $4,
                password_hash = COALESCE($5, password_hash), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserEntity>(&query)
            .bind(id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(input.role.as_str())
            .bind(&input.password_hash)
            .fetch_one(&mut *tx)
            .await?;

        if input.password_hash.is_some() {
            // a password change signs the user out everywhere
            sqlx::query("DELETE FROM sessions WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(row.into())
    }

    /// Deletes a user; the last admin cannot be deleted.
    pub async fn delete(&self, id: i64) -> Result<User, UserWriteError> {
        let timer = QueryTimer::new("delete_user");
        let mut tx = self.pool.begin().await?;

        let role = Self::current_role(&mut tx, id).await?;
        if role == Role::Admin && Self::other_admins(&mut tx, id).await? == 0 {
            return Err(UserWriteError::LastAdmin);
        }

        let query = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserEntity>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(row.into())
    }

    pub async fn record_login(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

const SESSION_COLUMNS: &str =
    "id, token_hash, user_id, ip_address, user_agent, expires_at, created_at, last_seen_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &NewSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO sessions (token_hash, user_id, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SessionEntity>(&query)
            .bind(&session.token_hash)
            .bind(session.user_id)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Unexpired session for a token hash; touches `last_seen_at`.
    pub async fn find_active(&self, token_hash: &str) -> Result<Option<Session>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_session");
        let query = format!(
            r#"
            UPDATE sessions SET last_seen_at = NOW()
            WHERE token_hash = $1 AND expires_at > NOW()
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SessionEntity>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        timer.record();
        Ok(row.map(Into::into))
    }

    /// Replaces the current session with a new one in one transaction.
    pub async fn rotate(&self, old_token_hash: Option<&str>, new: &NewSession) -> Result<Session, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        if let Some(old) = old_token_hash {
            sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
                .bind(old)
                .execute(&mut *tx)
                .await?;
        }
        let query = format!(
            r#"
            INSERT INTO sessions (token_hash, user_id, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SessionEntity>(&query)
            .bind(&new.token_hash)
            .bind(new.user_id)
            .bind(&new.ip_address)
            .bind(&new.user_agent)
            .bind(new.expires_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn delete(&self, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
