//! Impersonation audit trail and compliance reporting.

pub mod report;
pub mod trail;

pub use report::ComplianceReport;
pub use trail::{ActionRecord, AuditTrail};
