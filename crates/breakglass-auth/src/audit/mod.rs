//! Forwarding of impersonation events to an external audit log.

pub mod sink;

pub use sink::{AuditSink, TracingAuditSink};
