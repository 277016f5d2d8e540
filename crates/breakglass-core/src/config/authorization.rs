//! Role policy configuration for the bundled authorizer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Role-to-permission grants.
///
/// A grant of `"*"` allows everything; a grant ending in `":*"` allows
/// every permission with that prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Permissions granted to each role name.
    #[serde(default = "default_role_permissions")]
    pub role_permissions: HashMap<String, Vec<String>>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            role_permissions: default_role_permissions(),
        }
    }
}

fn default_role_permissions() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert("admin".to_string(), vec!["*".to_string()]);
    map.insert(
        "support".to_string(),
        vec!["impersonate:user".to_string()],
    );
    map
}
