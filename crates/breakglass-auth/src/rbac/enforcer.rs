//! Role-based [`Authorizer`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use breakglass_core::result::AppResult;
use breakglass_core::types::UserId;

use super::authorizer::{Authorizer, Decision, ResourceDescriptor};
use super::policies::RbacPolicies;
use crate::directory::UserLookup;

/// Allows an action when any of the actor's roles is granted the
/// permission. Unknown actors are denied.
#[derive(Clone)]
pub struct RbacAuthorizer {
    policies: RbacPolicies,
    users: Arc<dyn UserLookup>,
}

impl std::fmt::Debug for RbacAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacAuthorizer")
            .field("policies", &self.policies)
            .finish()
    }
}

impl RbacAuthorizer {
    /// Create an authorizer resolving roles through `users`.
    pub fn new(policies: RbacPolicies, users: Arc<dyn UserLookup>) -> Self {
        Self { policies, users }
    }
}

#[async_trait]
impl Authorizer for RbacAuthorizer {
    async fn evaluate(
        &self,
        actor_id: UserId,
        permission: &str,
        resource: &ResourceDescriptor,
    ) -> AppResult<Decision> {
        let Some(actor) = self.users.find_by_id(actor_id).await? else {
            debug!(actor_id = %actor_id, permission, "Unknown actor denied");
            return Ok(Decision::Deny);
        };

        let decision = if self.policies.any_role_has(&actor.roles, permission) {
            Decision::Allow
        } else {
            Decision::Deny
        };

        debug!(
            actor_id = %actor_id,
            permission,
            resource = %resource,
            ?decision,
            "Evaluated permission"
        );
        Ok(decision)
    }
}
