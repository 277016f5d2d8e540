//! Sessions minted for the impersonated view.

use breakglass_core::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Result of minting a session bound to the target user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    /// Opaque session identifier.
    pub session_id: String,
    /// Bearer token. Never serialized.
    #[serde(skip_serializing, default)]
    pub token: String,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// A row in `user_sessions`: an ordinary login session as stored by the
/// bundled session issuer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSession {
    /// Session identifier.
    pub id: Uuid,
    /// The user the session authenticates.
    pub user_id: UserId,
    /// SHA-256 hex digest of the bearer token.
    pub token_hash: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Set once the session has been revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    /// Not revoked and not expired at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}
