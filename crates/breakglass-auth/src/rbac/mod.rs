//! Authorization contract and role-based implementation.

pub mod authorizer;
pub mod enforcer;
pub mod policies;

pub use authorizer::{Authorizer, Decision, ResourceDescriptor};
pub use enforcer::RbacAuthorizer;
pub use policies::RbacPolicies;
