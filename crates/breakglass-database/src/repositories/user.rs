//! User directory repository implementation.

use sqlx::PgPool;

use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;
use breakglass_entity::user::User;

/// Repository for the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an active user by ID.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    /// Role names of an active user, empty if the user does not exist.
    pub async fn find_roles(&self, id: UserId) -> AppResult<Vec<String>> {
        let roles: Option<Vec<String>> =
            sqlx::query_scalar("SELECT roles FROM users WHERE id = $1 AND is_active")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to load user roles", e)
                })?;
        Ok(roles.unwrap_or_default())
    }
}
