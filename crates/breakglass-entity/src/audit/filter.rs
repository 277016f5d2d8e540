//! Audit trail query filter.

use breakglass_core::types::ImpersonationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event_type::AuditEventType;

/// Narrowing applied on top of the tenant scope when searching the trail.
///
/// `from` is inclusive, `to` is exclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Only events for this impersonation.
    pub impersonation_id: Option<ImpersonationId>,
    /// Only events of this type.
    pub event_type: Option<AuditEventType>,
    /// Only events at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only events before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Whether an event at `at` of type `event_type` for `impersonation_id`
    /// passes the filter.
    pub fn matches(
        &self,
        impersonation_id: ImpersonationId,
        event_type: AuditEventType,
        at: DateTime<Utc>,
    ) -> bool {
        self.impersonation_id.is_none_or(|id| id == impersonation_id)
            && self.event_type.is_none_or(|t| t == event_type)
            && self.from.is_none_or(|from| at >= from)
            && self.to.is_none_or(|to| at < to)
    }
}
