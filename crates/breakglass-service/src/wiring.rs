//! PostgreSQL wiring shared by the server and the CLI.

use std::sync::Arc;

use breakglass_auth::{
    DirectoryUserLookup, RbacAuthorizer, RbacPolicies, TokenSessionIssuer, TracingAuditSink,
    UserLookup,
};
use breakglass_core::config::AppConfig;
use breakglass_database::repositories::{UserRepository, UserSessionRepository};
use breakglass_database::{DatabasePool, ImpersonationRepository, PgImpersonationStore};

use crate::audit::AuditTrail;
use crate::impersonation::ImpersonationService;

impl ImpersonationService {
    /// Wire the service against PostgreSQL with the bundled collaborators:
    /// the `users` directory, opaque-token sessions, role policies from
    /// `[authorization]` and tracing-backed audit forwarding.
    pub fn postgres(config: &AppConfig, db: &DatabasePool) -> Self {
        let pool = db.pool().clone();

        let repo: Arc<dyn ImpersonationRepository> =
            Arc::new(PgImpersonationStore::new(pool.clone()));
        let users: Arc<dyn UserLookup> =
            Arc::new(DirectoryUserLookup::new(UserRepository::new(pool.clone())));
        let issuer = Arc::new(TokenSessionIssuer::new(UserSessionRepository::new(pool)));
        let authorizer = Arc::new(RbacAuthorizer::new(
            RbacPolicies::from_config(&config.authorization),
            Arc::clone(&users),
        ));
        let audit = AuditTrail::new(
            Arc::clone(&repo),
            Some(Arc::new(TracingAuditSink::new())),
            config.impersonation.audit_all_actions,
        );

        Self::new(
            config.impersonation.clone(),
            repo,
            users,
            issuer,
            authorizer,
            audit,
        )
    }
}
