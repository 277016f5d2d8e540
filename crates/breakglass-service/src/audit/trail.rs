//! The impersonation audit trail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use breakglass_auth::audit::AuditSink;
use breakglass_core::error::AppError;
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope};
use breakglass_database::store::ImpersonationRepository;
use breakglass_entity::audit::{AuditEvent, AuditEventType, AuditFilter};
use breakglass_entity::impersonation::ImpersonationSession;

use super::report::ComplianceReport;

/// An action taken while impersonating, as reported by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The impersonation under which the action ran.
    pub impersonation_id: ImpersonationId,
    /// Operation, e.g. `"invoice.refund"`.
    pub action: String,
    /// Resource acted on.
    pub resource: Option<String>,
    /// Extra facts to keep with the event.
    #[serde(default)]
    pub details: serde_json::Value,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
}

/// Writes, forwards and queries impersonation audit events.
///
/// Events are appended to the repository first; forwarding to the
/// optional [`AuditSink`] is best effort and never fails the caller.
#[derive(Clone)]
pub struct AuditTrail {
    repo: Arc<dyn ImpersonationRepository>,
    sink: Option<Arc<dyn AuditSink>>,
    audit_all_actions: bool,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("has_sink", &self.sink.is_some())
            .field("audit_all_actions", &self.audit_all_actions)
            .finish()
    }
}

impl AuditTrail {
    /// Creates a new audit trail.
    pub fn new(
        repo: Arc<dyn ImpersonationRepository>,
        sink: Option<Arc<dyn AuditSink>>,
        audit_all_actions: bool,
    ) -> Self {
        Self {
            repo,
            sink,
            audit_all_actions,
        }
    }

    /// The `started` event for a freshly created session.
    pub fn started_event(
        session: &ImpersonationSession,
        duration_minutes: u32,
        at: DateTime<Utc>,
    ) -> AuditEvent {
        let details = json!({
            "impersonator_id": session.impersonator_id,
            "target_user_id": session.target_user_id,
            "reason": session.reason,
            "ticket_number": session.ticket_number,
            "duration_minutes": duration_minutes,
            "expires_at": session.expires_at,
        });
        AuditEvent::for_session(session, AuditEventType::Started, details, at)
    }

    /// The `ended` event for a session its actor just closed.
    pub fn ended_event(
        session: &ImpersonationSession,
        session_revoked: bool,
        at: DateTime<Utc>,
    ) -> AuditEvent {
        let details = json!({
            "impersonator_id": session.impersonator_id,
            "target_user_id": session.target_user_id,
            "end_reason": session.end_reason,
            "session_revoked": session_revoked,
            "duration_seconds": (at - session.created_at).num_seconds(),
        });
        AuditEvent::for_session(session, AuditEventType::Ended, details, at)
    }

    /// The `expired` event for a session closed on timeout.
    pub fn expired_event(session: &ImpersonationSession, at: DateTime<Utc>) -> AuditEvent {
        let details = json!({
            "impersonator_id": session.impersonator_id,
            "target_user_id": session.target_user_id,
            "end_reason": session.end_reason,
            "expires_at": session.expires_at,
        });
        AuditEvent::for_session(session, AuditEventType::Expired, details, at)
    }

    /// Append an event and forward it.
    pub async fn record(&self, event: &AuditEvent) -> AppResult<()> {
        self.repo.create_audit_event(event).await?;
        self.forward(event).await;
        Ok(())
    }

    /// Forward an already persisted event to the sink, if any.
    pub async fn forward(&self, event: &AuditEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.forward(event).await {
            warn!(
                event_id = %event.id,
                impersonation_id = %event.impersonation_id,
                event_type = %event.event_type,
                error = %e,
                "Failed to forward audit event"
            );
        }
    }

    /// Record an action taken under an impersonation.
    ///
    /// Returns `Ok(None)` when action auditing is disabled. The
    /// impersonation must exist in `scope` and be effectively active.
    pub async fn record_action(
        &self,
        scope: &TenantScope,
        record: ActionRecord,
    ) -> AppResult<Option<AuditEvent>> {
        if !self.audit_all_actions {
            return Ok(None);
        }
        if record.action.trim().is_empty() {
            return Err(AppError::validation("Action must not be empty"));
        }

        let session = self
            .repo
            .get(record.impersonation_id, scope)
            .await?
            .ok_or_else(AppError::impersonation_not_found)?;

        let now = Utc::now();
        if !session.is_effectively_active(now) {
            return Err(AppError::validation(format!(
                "Impersonation {} is no longer active",
                session.id
            )));
        }

        let details = if record.details.is_null() {
            json!({})
        } else {
            record.details
        };
        let event = AuditEvent::for_session(&session, AuditEventType::ActionPerformed, details, now)
            .with_action(record.action, record.resource)
            .with_request(
                record.ip_address.or_else(|| session.ip_address.clone()),
                record.user_agent.or_else(|| session.user_agent.clone()),
            );

        self.record(&event).await?;

        info!(
            impersonation_id = %session.id,
            impersonator_id = %session.impersonator_id,
            action = event.action.as_deref().unwrap_or_default(),
            "Recorded impersonated action"
        );
        Ok(Some(event))
    }

    /// Search the trail within a tenant scope.
    pub async fn search(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from >= to {
                return Err(AppError::validation("Audit search window is empty"));
            }
        }
        let page = PageRequest::new(page.page, page.page_size);
        self.repo.list_audit_events(scope, filter, &page).await
    }

    /// Summarise activity in `[from, to)`.
    pub async fn compliance_report(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<ComplianceReport> {
        if from >= to {
            return Err(AppError::validation("Report window is empty"));
        }
        let counts = self.repo.count_audit_events(scope, from, to).await?;
        Ok(ComplianceReport::from_counts(*scope, from, to, &counts))
    }
}
