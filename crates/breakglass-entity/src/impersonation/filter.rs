//! List filters for impersonation sessions.

use breakglass_core::types::UserId;
use serde::{Deserialize, Serialize};

/// Optional narrowing applied on top of the tenant scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    /// Only sessions that are active and not past their deadline.
    #[serde(default)]
    pub active_only: bool,
    /// Only sessions started by this actor.
    pub impersonator_id: Option<UserId>,
    /// Only sessions targeting this user.
    pub target_user_id: Option<UserId>,
}
