//! Role-to-permission grants.

use std::collections::{HashMap, HashSet};

use breakglass_core::config::AuthorizationConfig;

/// Permission grants keyed by lowercase role name.
#[derive(Debug, Clone, Default)]
pub struct RbacPolicies {
    grants: HashMap<String, HashSet<String>>,
}

impl RbacPolicies {
    /// Empty policy set: every check is denied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[authorization]` configuration section.
    pub fn from_config(config: &AuthorizationConfig) -> Self {
        let mut policies = Self::new();
        for (role, permissions) in &config.role_permissions {
            for permission in permissions {
                policies.grant(role, permission);
            }
        }
        policies
    }

    /// Grant `permission` to `role`.
    pub fn grant(&mut self, role: &str, permission: &str) -> &mut Self {
        self.grants
            .entry(role.to_lowercase())
            .or_default()
            .insert(permission.trim().to_string());
        self
    }

    /// Whether `role` holds `permission`, directly or through `*` or a
    /// `prefix:*` wildcard.
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        let Some(granted) = self.grants.get(&role.to_lowercase()) else {
            return false;
        };
        granted.iter().any(|grant| grant_covers(grant, permission))
    }

    /// Whether any of `roles` holds `permission`.
    pub fn any_role_has(&self, roles: &[String], permission: &str) -> bool {
        roles.iter().any(|role| self.has_permission(role, permission))
    }
}

fn grant_covers(grant: &str, permission: &str) -> bool {
    if grant == "*" || grant == permission {
        return true;
    }
    match grant.strip_suffix('*') {
        Some(prefix) if prefix.ends_with(':') => permission.starts_with(prefix),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_wildcard_grants() {
        let mut policies = RbacPolicies::new();
        policies
            .grant("Support", "impersonate:user")
            .grant("auditor", "audit:*")
            .grant("admin", "*");

        assert!(policies.has_permission("support", "impersonate:user"));
        assert!(!policies.has_permission("support", "impersonate:admin"));
        assert!(policies.has_permission("auditor", "audit:read"));
        assert!(!policies.has_permission("auditor", "auditing"));
        assert!(policies.has_permission("ADMIN", "anything"));
        assert!(!policies.has_permission("viewer", "impersonate:user"));
    }

    #[test]
    fn test_default_config_grants() {
        let policies = RbacPolicies::from_config(&AuthorizationConfig::default());
        assert!(policies.any_role_has(&["viewer".into(), "support".into()], "impersonate:user"));
        assert!(!policies.any_role_has(&["viewer".into()], "impersonate:user"));
    }
}
