//! Audit sink contract and the tracing-backed implementation.

use async_trait::async_trait;
use tracing::info;

use breakglass_core::result::AppResult;
use breakglass_entity::audit::AuditEvent;

/// A general-purpose audit log outside the impersonation trail.
///
/// Forwarding is best effort: callers log and swallow failures.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Forward one event.
    async fn forward(&self, event: &AuditEvent) -> AppResult<()>;
}

/// Emits each event as a structured `tracing` record on the
/// `breakglass::audit` target, for log shippers to collect.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Create the sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn forward(&self, event: &AuditEvent) -> AppResult<()> {
        info!(
            target: "breakglass::audit",
            event_id = %event.id,
            impersonation_id = %event.impersonation_id,
            app_id = %event.app_id,
            event_type = %event.event_type,
            action = event.action.as_deref().unwrap_or(""),
            resource = event.resource.as_deref().unwrap_or(""),
            details = %event.details,
            "Impersonation audit event"
        );
        Ok(())
    }
}
