//! Opaque bearer-token session issuer backed by `user_sessions`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use breakglass_core::error::AppError;
use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;
use breakglass_database::repositories::UserSessionRepository;
use breakglass_entity::impersonation::IssuedSession;

use super::issuer::SessionIssuer;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Issues random bearer tokens and stores only their SHA-256 digest.
#[derive(Debug, Clone)]
pub struct TokenSessionIssuer {
    sessions: UserSessionRepository,
}

impl TokenSessionIssuer {
    /// Create an issuer writing to `sessions`.
    pub fn new(sessions: UserSessionRepository) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl SessionIssuer for TokenSessionIssuer {
    async fn create(&self, user_id: UserId, ttl: Duration) -> AppResult<IssuedSession> {
        if ttl <= Duration::zero() {
            return Err(AppError::validation("Session lifetime must be positive"));
        }

        let token = generate_token();
        let session_id = Uuid::new_v4();
        let expires_at = Utc::now() + ttl;

        self.sessions
            .create(session_id, user_id, &sha256_hex(&token), expires_at)
            .await?;

        info!(
            session_id = %session_id,
            user_id = %user_id,
            expires_at = %expires_at,
            "Issued session"
        );

        Ok(IssuedSession {
            session_id: session_id.to_string(),
            token,
            expires_at,
        })
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        let hash = sha256_hex(token);
        if self.sessions.revoke_by_token_hash(&hash, Utc::now()).await? {
            info!("Revoked session");
            return Ok(());
        }

        match self.sessions.find_by_token_hash(&hash).await? {
            Some(session) => {
                debug!(session_id = %session.id, "Session already revoked");
                Ok(())
            }
            None => Err(AppError::session_not_found("No session carries this token")),
        }
    }
}

/// Generate a URL-safe random token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
