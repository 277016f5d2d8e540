//! Tenant scope: the isolation boundary for every impersonation query.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{AppId, EnvironmentId, OrganizationId};

/// Application (required) plus optional environment and organization.
///
/// Two scopes are equal only when all three levels match, with `None`
/// matching only `None`. Records in a different scope are invisible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    /// Owning application.
    pub app_id: AppId,
    /// Environment within the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<EnvironmentId>,
    /// Organization within the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
}

impl TenantScope {
    /// Application-wide scope.
    pub fn app(app_id: AppId) -> Self {
        Self {
            app_id,
            environment_id: None,
            organization_id: None,
        }
    }

    /// Narrow to an environment.
    pub fn with_environment(mut self, environment_id: EnvironmentId) -> Self {
        self.environment_id = Some(environment_id);
        self
    }

    /// Narrow to an organization.
    pub fn with_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app={}", self.app_id)?;
        if let Some(env) = &self.environment_id {
            write!(f, " env={env}")?;
        }
        if let Some(org) = &self.organization_id {
            write!(f, " org={org}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_levels_only_match_absent() {
        let app = AppId::new();
        let base = TenantScope::app(app);
        let with_env = base.with_environment(EnvironmentId::new());
        assert_ne!(base, with_env);
        assert_eq!(base, TenantScope::app(app));
    }

    #[test]
    fn test_display_lists_present_levels() {
        let scope = TenantScope::app(AppId::new());
        assert!(!scope.to_string().contains("env="));
        let org = OrganizationId::new();
        let scoped = scope.with_organization(org);
        assert!(scoped.to_string().ends_with(&format!("org={org}")));
    }
}
