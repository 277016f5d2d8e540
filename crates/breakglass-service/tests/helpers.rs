//! Shared test helpers for service tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use breakglass_auth::audit::AuditSink;
use breakglass_auth::directory::UserLookup;
use breakglass_auth::rbac::{Authorizer, RbacAuthorizer, RbacPolicies};
use breakglass_auth::session::SessionIssuer;
use breakglass_core::config::{AuthorizationConfig, ImpersonationConfig};
use breakglass_core::error::AppError;
use breakglass_core::result::AppResult;
use breakglass_core::types::{
    AppId, ImpersonationId, PageRequest, PageResponse, TenantScope, UserId,
};
use breakglass_database::store::{ImpersonationRepository, MemoryImpersonationRepository};
use breakglass_entity::audit::{AuditEvent, AuditEventCount, AuditEventType, AuditFilter};
use breakglass_entity::impersonation::{
    EndReason, ImpersonationSession, IssuedSession, SessionFilter,
};
use breakglass_entity::user::User;
use breakglass_service::{AuditTrail, ImpersonationService};

/// A reason long enough for the default policy.
pub const REASON: &str = "Customer reported missing invoices";

/// Users keyed by ID.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    users: Mutex<HashMap<UserId, User>>,
}

impl FakeDirectory {
    pub fn add(&self, email: &str, roles: &[&str]) -> User {
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            display_name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserLookup for FakeDirectory {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

/// One session minted by [`FakeIssuer`].
#[derive(Debug, Clone)]
pub struct Minted {
    pub session_id: String,
    pub user_id: UserId,
    pub revoked: bool,
}

/// Records every minted and revoked session; either step can be made to fail.
#[derive(Debug, Default)]
pub struct FakeIssuer {
    sessions: Mutex<HashMap<String, Minted>>,
    pub fail_create: AtomicBool,
    pub fail_revoke: AtomicBool,
}

impl FakeIssuer {
    pub fn minted(&self) -> Vec<Minted> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .is_some_and(|m| m.revoked)
    }
}

#[async_trait]
impl SessionIssuer for FakeIssuer {
    async fn create(&self, user_id: UserId, ttl: Duration) -> AppResult<IssuedSession> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::external_service("issuer unavailable"));
        }
        let session_id = uuid::Uuid::new_v4().to_string();
        let token = format!("tok-{}", uuid::Uuid::new_v4().simple());
        self.sessions.lock().unwrap().insert(
            token.clone(),
            Minted {
                session_id: session_id.clone(),
                user_id,
                revoked: false,
            },
        );
        Ok(IssuedSession {
            session_id,
            token,
            expires_at: Utc::now() + ttl,
        })
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(AppError::external_service("issuer unavailable"));
        }
        match self.sessions.lock().unwrap().get_mut(token) {
            Some(minted) => {
                minted.revoked = true;
                Ok(())
            }
            None => Err(AppError::session_not_found("unknown token")),
        }
    }
}

/// Captures forwarded events.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn forward(&self, event: &AuditEvent) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::external_service("sink unavailable"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    pub inner: MemoryImpersonationRepository,
    pub fail_create: AtomicBool,
    pub fail_audit: AtomicBool,
}

impl FlakyRepository {
    fn injected() -> AppError {
        AppError::database("injected failure")
    }
}

#[async_trait]
impl ImpersonationRepository for FlakyRepository {
    async fn create(&self, session: &ImpersonationSession) -> AppResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create(session).await
    }

    async fn create_with_audit(
        &self,
        session: &ImpersonationSession,
        event: &AuditEvent,
    ) -> AppResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_with_audit(session, event).await
    }

    async fn get(
        &self,
        id: ImpersonationId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.inner.get(id, scope).await
    }

    async fn find_active_by_issued_session(
        &self,
        issued_session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.inner
            .find_active_by_issued_session(issued_session_id, now)
            .await
    }

    async fn get_active(
        &self,
        impersonator_id: UserId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.inner.get_active(impersonator_id, scope).await
    }

    async fn end_session(
        &self,
        id: ImpersonationId,
        ended_at: DateTime<Utc>,
        reason: &EndReason,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.inner.end_session(id, ended_at, reason).await
    }

    async fn list_sessions(
        &self,
        scope: &TenantScope,
        filter: &SessionFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<ImpersonationSession>> {
        self.inner.list_sessions(scope, filter, page, now).await
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ImpersonationSession>> {
        self.inner.find_expired(now, limit).await
    }

    async fn create_audit_event(&self, event: &AuditEvent) -> AppResult<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_audit_event(event).await
    }

    async fn list_audit_events(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>> {
        self.inner.list_audit_events(scope, filter, page).await
    }

    async fn count_audit_events(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEventCount>> {
        self.inner.count_audit_events(scope, from, to).await
    }
}

/// A wired service with one tenant, one support agent and one customer.
pub struct TestApp {
    pub service: ImpersonationService,
    pub repo: Arc<FlakyRepository>,
    pub directory: Arc<FakeDirectory>,
    pub issuer: Arc<FakeIssuer>,
    pub sink: Arc<RecordingSink>,
    pub scope: TenantScope,
    pub agent: User,
    pub customer: User,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ImpersonationConfig::default())
    }

    pub fn with_config(mut config: ImpersonationConfig) -> Self {
        config.validate().expect("test config is valid");

        let repo = Arc::new(FlakyRepository::default());
        let directory = Arc::new(FakeDirectory::default());
        let issuer = Arc::new(FakeIssuer::default());
        let sink = Arc::new(RecordingSink::default());

        let agent = directory.add("agent@support.test", &["support"]);
        let customer = directory.add("customer@example.test", &["member"]);

        let authorizer: Arc<dyn Authorizer> = Arc::new(RbacAuthorizer::new(
            RbacPolicies::from_config(&AuthorizationConfig::default()),
            directory.clone(),
        ));
        let audit = AuditTrail::new(repo.clone(), Some(sink.clone()), config.audit_all_actions);
        let service = ImpersonationService::new(
            config,
            repo.clone(),
            directory.clone(),
            issuer.clone(),
            authorizer,
            audit,
        );

        Self {
            service,
            repo,
            directory,
            issuer,
            sink,
            scope: TenantScope::app(AppId::new()),
            agent,
            customer,
        }
    }

    pub async fn sessions(&self) -> Vec<ImpersonationSession> {
        self.repo.inner.all_sessions().await
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.repo.inner.all_events().await
    }

    pub async fn events_of(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.events()
            .await
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Insert an active row for the agent whose deadline is already past.
    pub async fn seed_stale(&self) -> ImpersonationSession {
        self.seed_stale_for(self.agent.id).await
    }

    /// Insert an active row for `impersonator_id` whose deadline is already past.
    pub async fn seed_stale_for(&self, impersonator_id: UserId) -> ImpersonationSession {
        let created_at = Utc::now() - Duration::hours(2);
        let session = ImpersonationSession {
            id: ImpersonationId::new(),
            app_id: self.scope.app_id,
            environment_id: self.scope.environment_id,
            organization_id: self.scope.organization_id,
            impersonator_id,
            target_user_id: self.customer.id,
            issued_session_id: uuid::Uuid::new_v4().to_string(),
            session_token: "stale-token".to_string(),
            reason: REASON.to_string(),
            ticket_number: None,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::json!({}),
            active: true,
            expires_at: created_at + Duration::minutes(30),
            ended_at: None,
            end_reason: None,
            created_at,
            updated_at: created_at,
        };
        self.repo.inner.create(&session).await.unwrap();
        session
    }
}
