//! Audit event entity model.

use breakglass_core::types::{
    AppId, AuditEventId, EnvironmentId, ImpersonationId, OrganizationId, TenantScope,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::event_type::AuditEventType;
use crate::impersonation::ImpersonationSession;

/// An immutable record of an impersonation lifecycle transition or of an
/// action taken while impersonating.
///
/// The tenant scope is copied from the session so the trail can be
/// queried in isolation, and `details` captures the relevant facts at
/// event time so the record stands on its own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub id: AuditEventId,
    /// The impersonation this event belongs to.
    pub impersonation_id: ImpersonationId,
    /// Owning application.
    pub app_id: AppId,
    /// Environment within the application.
    pub environment_id: Option<EnvironmentId>,
    /// Organization within the application.
    pub organization_id: Option<OrganizationId>,
    /// What happened.
    pub event_type: AuditEventType,
    /// Operation performed, for `action_performed` events.
    pub action: Option<String>,
    /// Resource acted on, for `action_performed` events.
    pub resource: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// Snapshot of event facts (JSON object).
    pub details: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Start an event for `session`, inheriting its scope and request
    /// metadata.
    pub fn for_session(
        session: &ImpersonationSession,
        event_type: AuditEventType,
        details: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            impersonation_id: session.id,
            app_id: session.app_id,
            environment_id: session.environment_id,
            organization_id: session.organization_id,
            event_type,
            action: None,
            resource: None,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            details,
            created_at: at,
        }
    }

    /// Attach the operation and resource of an in-session action.
    pub fn with_action(mut self, action: impl Into<String>, resource: Option<String>) -> Self {
        self.action = Some(action.into());
        self.resource = resource;
        self
    }

    /// Replace the request metadata inherited from the session.
    pub fn with_request(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// The tenant scope this event belongs to.
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            app_id: self.app_id,
            environment_id: self.environment_id,
            organization_id: self.organization_id,
        }
    }
}

/// Number of audit events of one type, as aggregated for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEventCount {
    /// Event type.
    pub event_type: AuditEventType,
    /// Number of matching events.
    pub count: i64,
}
