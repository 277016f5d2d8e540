//! # breakglass-service
//!
//! The impersonation state machine and its audit trail.
//!
//! Services follow constructor injection: the repository and every
//! collaborator are provided at construction time as `Arc<dyn ...>`.
//! Services hold no mutable state of their own and are safe to share
//! across tasks.

pub mod audit;
pub mod impersonation;
mod wiring;

pub use audit::{ActionRecord, AuditTrail, ComplianceReport};
pub use impersonation::{
    EndRequest, EndResponse, ImpersonationService, ListRequest, StartRequest, StartResponse,
    VerifyResponse,
};
