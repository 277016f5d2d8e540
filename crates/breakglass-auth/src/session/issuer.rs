//! Session issuance contract.

use async_trait::async_trait;
use chrono::Duration;

use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;
use breakglass_entity::impersonation::IssuedSession;

/// Mints and revokes ordinary login sessions.
#[async_trait]
pub trait SessionIssuer: Send + Sync + 'static {
    /// Mint a session authenticating as `user_id`, valid for `ttl`.
    async fn create(&self, user_id: UserId, ttl: Duration) -> AppResult<IssuedSession>;

    /// Revoke the session carrying `token`. Revoking an already revoked
    /// session succeeds; an unknown token is `SessionNotFound`.
    async fn revoke(&self, token: &str) -> AppResult<()>;
}
