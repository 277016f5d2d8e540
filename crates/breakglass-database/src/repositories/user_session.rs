//! Login session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;
use breakglass_entity::impersonation::UserSession;

/// Repository for the `user_sessions` table.
#[derive(Debug, Clone)]
pub struct UserSessionRepository {
    pool: PgPool,
}

impl UserSessionRepository {
    /// Create a new user session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a session for `user_id`.
    pub async fn create(
        &self,
        id: Uuid,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<UserSession> {
        sqlx::query_as::<_, UserSession>(
            "INSERT INTO user_sessions (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create session", e))
    }

    /// Find a session by token hash, revoked or not.
    pub async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<UserSession>> {
        sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session by token", e)
            })
    }

    /// Revoke the session with this token hash. Returns `false` when no
    /// unrevoked session matched.
    pub async fn revoke_by_token_hash(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2 \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke session", e))?;
        Ok(result.rows_affected() > 0)
    }
}
