//! Outputs of the impersonation service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use breakglass_core::types::{ImpersonationId, UserId};
use breakglass_entity::impersonation::ImpersonationSession;

/// Result of a successful start.
///
/// The only place the issued token leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// The new impersonation record.
    pub impersonation_id: ImpersonationId,
    /// Session issued for the target.
    pub session_id: String,
    /// Bearer token of that session.
    pub session_token: String,
    /// When the impersonation expires.
    pub expires_at: DateTime<Utc>,
    /// Summary naming the target.
    pub message: String,
}

/// Result of ending an impersonation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndResponse {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// The impersonation that ended.
    pub impersonation_id: ImpersonationId,
    /// When it ended.
    pub ended_at: DateTime<Utc>,
    /// Whether the issued session was revoked by this call.
    pub session_revoked: bool,
}

/// Whether an issued session belongs to an active impersonation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// `true` when the session is an impersonated view.
    pub is_impersonating: bool,
    /// The impersonation record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonation_id: Option<ImpersonationId>,
    /// The actor behind the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator_id: Option<UserId>,
    /// The user the session acts as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<UserId>,
    /// When the impersonation expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Banner text for the UI, when the indicator is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_message: Option<String>,
}

impl VerifyResponse {
    /// The session is not an impersonated view.
    pub fn not_impersonating() -> Self {
        Self::default()
    }

    /// The session belongs to `session`.
    pub fn impersonating(session: &ImpersonationSession, indicator_message: Option<String>) -> Self {
        Self {
            is_impersonating: true,
            impersonation_id: Some(session.id),
            impersonator_id: Some(session.impersonator_id),
            target_user_id: Some(session.target_user_id),
            expires_at: Some(session.expires_at),
            indicator_message,
        }
    }
}
