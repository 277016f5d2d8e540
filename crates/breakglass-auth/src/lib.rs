//! # breakglass-auth
//!
//! The narrow collaborator contracts the impersonation service consumes,
//! and the implementations bundled with Breakglass.
//!
//! ## Modules
//!
//! - `directory`: [`UserLookup`] and the `users`-table implementation
//! - `session`: [`SessionIssuer`] and the opaque-token implementation
//! - `rbac`: [`Authorizer`] and the role-policy implementation
//! - `audit`: [`AuditSink`] and the tracing-backed implementation

pub mod audit;
pub mod directory;
pub mod rbac;
pub mod session;

pub use audit::{AuditSink, TracingAuditSink};
pub use directory::{DirectoryUserLookup, UserLookup};
pub use rbac::{Authorizer, Decision, RbacAuthorizer, RbacPolicies, ResourceDescriptor};
pub use session::{SessionIssuer, TokenSessionIssuer};
