//! Impersonation session entity model.

use breakglass_core::types::{
    AppId, EnvironmentId, ImpersonationId, OrganizationId, TenantScope, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::end_reason::EndReason;

/// A time-boxed grant for one actor to act as another user.
///
/// Created once when an impersonation starts, transitioned out of the
/// active state exactly once (manual end or timeout), and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImpersonationSession {
    /// Unique impersonation identifier.
    pub id: ImpersonationId,

    // -- Tenant scope --
    /// Owning application.
    pub app_id: AppId,
    /// Environment within the application.
    pub environment_id: Option<EnvironmentId>,
    /// Organization within the application.
    pub organization_id: Option<OrganizationId>,

    // -- Actors --
    /// The privileged user acting as someone else.
    pub impersonator_id: UserId,
    /// The user being impersonated.
    pub target_user_id: UserId,

    // -- Issued session --
    /// Identifier of the session minted for the target.
    pub issued_session_id: String,
    /// Bearer token of the minted session. Never serialized.
    #[serde(skip_serializing, default)]
    pub session_token: String,

    // -- Justification --
    /// Free-text justification.
    pub reason: String,
    /// Optional support ticket reference.
    pub ticket_number: Option<String>,

    // -- Request metadata --
    /// Client IP address of the start request.
    pub ip_address: Option<String>,
    /// User-Agent of the start request.
    pub user_agent: Option<String>,
    /// Caller-supplied metadata (JSON object).
    pub metadata: serde_json::Value,

    // -- Lifecycle --
    /// Whether the row has not yet been ended or expired.
    pub active: bool,
    /// Hard deadline for the grant.
    pub expires_at: DateTime<Utc>,
    /// When the session left the active state.
    pub ended_at: Option<DateTime<Utc>>,
    /// `manual`, `timeout`, or a caller-supplied reason.
    pub end_reason: Option<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl ImpersonationSession {
    /// Usable right now: active and not past its deadline.
    pub fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        self.active && self.ended_at.is_none() && now < self.expires_at
    }

    /// Still flagged active although the deadline has passed.
    pub fn is_stale_active(&self, now: DateTime<Utc>) -> bool {
        self.active && now >= self.expires_at
    }

    /// The tenant scope this session belongs to.
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            app_id: self.app_id,
            environment_id: self.environment_id,
            organization_id: self.organization_id,
        }
    }

    /// Whether the session is visible from `scope`.
    pub fn in_scope(&self, scope: &TenantScope) -> bool {
        self.scope() == *scope
    }

    /// Parsed end reason, if the session has ended.
    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason.clone().map(EndReason::from)
    }

    /// Granted length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.expires_at - self.created_at).num_minutes()
    }

    /// Time left before the deadline, zero once passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }
}
