//! Compliance report over the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use breakglass_core::types::TenantScope;
use breakglass_entity::audit::{AuditEventCount, AuditEventType};

/// Impersonation activity in one tenant over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Tenant the report covers.
    pub scope: TenantScope,
    /// Window start (inclusive).
    pub period_start: DateTime<Utc>,
    /// Window end (exclusive).
    pub period_end: DateTime<Utc>,
    /// Impersonations started.
    pub started: i64,
    /// Impersonations ended by their actor.
    pub ended: i64,
    /// Impersonations closed on timeout.
    pub expired: i64,
    /// Actions recorded while impersonating.
    pub actions_performed: i64,
}

impl ComplianceReport {
    /// Fold per-type counts into a report.
    pub fn from_counts(
        scope: TenantScope,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        counts: &[AuditEventCount],
    ) -> Self {
        let mut report = Self {
            scope,
            period_start,
            period_end,
            started: 0,
            ended: 0,
            expired: 0,
            actions_performed: 0,
        };
        for c in counts {
            let slot = match c.event_type {
                AuditEventType::Started => &mut report.started,
                AuditEventType::Ended => &mut report.ended,
                AuditEventType::Expired => &mut report.expired,
                AuditEventType::ActionPerformed => &mut report.actions_performed,
            };
            *slot += c.count;
        }
        report
    }

    /// Lifecycle transitions out of the active state.
    pub fn closed(&self) -> i64 {
        self.ended + self.expired
    }

    /// Total events in the window.
    pub fn total_events(&self) -> i64 {
        self.started + self.ended + self.expired + self.actions_performed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakglass_core::types::AppId;

    #[test]
    fn test_from_counts_folds_each_type() {
        let now = Utc::now();
        let counts = vec![
            AuditEventCount { event_type: AuditEventType::Started, count: 4 },
            AuditEventCount { event_type: AuditEventType::Ended, count: 2 },
            AuditEventCount { event_type: AuditEventType::Expired, count: 1 },
        ];
        let report = ComplianceReport::from_counts(TenantScope::app(AppId::new()), now, now, &counts);

        assert_eq!(report.started, 4);
        assert_eq!(report.closed(), 3);
        assert_eq!(report.actions_performed, 0);
        assert_eq!(report.total_events(), 7);
    }
}
