//! User lookup contract and the `users`-table implementation.

use async_trait::async_trait;

use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;
use breakglass_database::repositories::UserRepository;
use breakglass_entity::user::User;

/// Resolves users by ID.
#[async_trait]
pub trait UserLookup: Send + Sync + 'static {
    /// Find a user. `Ok(None)` when the user does not exist or is disabled.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;
}

/// [`UserLookup`] over the `users` table.
#[derive(Debug, Clone)]
pub struct DirectoryUserLookup {
    users: UserRepository,
}

impl DirectoryUserLookup {
    /// Create a lookup over `users`.
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserLookup for DirectoryUserLookup {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }
}
