//! Impersonation audit trail entities.

pub mod event_type;
pub mod filter;
pub mod model;

pub use event_type::AuditEventType;
pub use filter::AuditFilter;
pub use model::{AuditEvent, AuditEventCount};
