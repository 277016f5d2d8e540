//! Inputs to the impersonation service.

use serde::{Deserialize, Serialize};

use breakglass_core::types::{ImpersonationId, PageRequest, TenantScope, UserId};
use breakglass_entity::impersonation::SessionFilter;

/// Request to begin impersonating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    /// Tenant the impersonation happens in.
    pub scope: TenantScope,
    /// The privileged actor.
    pub impersonator_id: UserId,
    /// The user to act as.
    pub target_user_id: UserId,
    /// Justification.
    #[serde(default)]
    pub reason: String,
    /// Support ticket reference.
    #[serde(default)]
    pub ticket_number: Option<String>,
    /// Requested length in minutes; `None` or `0` selects the default.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// Client IP address.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client User-Agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Free-form metadata stored with the session.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl StartRequest {
    /// A request with only the mandatory fields set.
    pub fn new(
        scope: TenantScope,
        impersonator_id: UserId,
        target_user_id: UserId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            impersonator_id,
            target_user_id,
            reason: reason.into(),
            ticket_number: None,
            duration_minutes: None,
            ip_address: None,
            user_agent: None,
            metadata: None,
        }
    }

    /// Set the requested duration.
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Set the ticket reference.
    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket_number = Some(ticket.into());
        self
    }

    /// Set client request metadata.
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Request to end an impersonation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndRequest {
    /// Tenant of the caller.
    pub scope: TenantScope,
    /// The impersonation to end.
    pub impersonation_id: ImpersonationId,
    /// The actor claiming ownership.
    pub impersonator_id: UserId,
    /// Why it ended; defaults to `manual`.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request to list impersonations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    /// Tenant of the caller.
    pub scope: TenantScope,
    /// Optional narrowing.
    #[serde(default)]
    pub filter: SessionFilter,
    /// Page to return.
    #[serde(default)]
    pub page: PageRequest,
}
