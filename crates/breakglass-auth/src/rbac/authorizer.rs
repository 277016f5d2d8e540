//! Authorization contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use breakglass_core::result::AppResult;
use breakglass_core::types::{TenantScope, UserId};

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The actor may proceed.
    Allow,
    /// The actor may not proceed.
    Deny,
}

impl Decision {
    /// Whether this is [`Decision::Allow`].
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The resource a permission is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Resource kind, e.g. `"user"`.
    pub kind: String,
    /// Resource identifier.
    pub id: String,
    /// Tenant the resource lives in.
    pub scope: TenantScope,
}

impl ResourceDescriptor {
    /// A user within a tenant scope.
    pub fn user(id: UserId, scope: TenantScope) -> Self {
        Self {
            kind: "user".to_string(),
            id: id.to_string(),
            scope,
        }
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Decides whether an actor holds a permission on a resource.
#[async_trait]
pub trait Authorizer: Send + Sync + 'static {
    /// Evaluate `permission` for `actor_id` on `resource`.
    async fn evaluate(
        &self,
        actor_id: UserId,
        permission: &str,
        resource: &ResourceDescriptor,
    ) -> AppResult<Decision>;
}
