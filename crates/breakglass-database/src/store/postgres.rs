//! PostgreSQL-backed impersonation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope, UserId};
use breakglass_entity::audit::{AuditEvent, AuditEventCount, AuditFilter};
use breakglass_entity::impersonation::{EndReason, ImpersonationSession, SessionFilter};

use super::ImpersonationRepository;
use crate::repositories::{audit, impersonation};
use crate::repositories::{ImpersonationAuditRepository, ImpersonationSessionRepository};

/// [`ImpersonationRepository`] over PostgreSQL.
///
/// The single-active invariant is enforced by the unique partial index
/// `uq_impersonation_one_active`; a violation surfaces as
/// `AlreadyImpersonating`.
#[derive(Debug, Clone)]
pub struct PgImpersonationStore {
    pool: PgPool,
    sessions: ImpersonationSessionRepository,
    audit: ImpersonationAuditRepository,
}

impl PgImpersonationStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: ImpersonationSessionRepository::new(pool.clone()),
            audit: ImpersonationAuditRepository::new(pool.clone()),
            pool,
        }
    }

    /// The session repository, for operator tooling.
    pub fn sessions(&self) -> &ImpersonationSessionRepository {
        &self.sessions
    }

    /// The audit repository, for operator tooling.
    pub fn audit(&self) -> &ImpersonationAuditRepository {
        &self.audit
    }
}

#[async_trait]
impl ImpersonationRepository for PgImpersonationStore {
    async fn create(&self, session: &ImpersonationSession) -> AppResult<()> {
        self.sessions.create(session).await
    }

    async fn create_with_audit(
        &self,
        session: &ImpersonationSession,
        event: &AuditEvent,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        impersonation::insert_query(session)
            .execute(&mut *tx)
            .await
            .map_err(impersonation::map_insert_error)?;

        audit::insert_query(event)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to create audit event", e)
            })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }

    async fn get(
        &self,
        id: ImpersonationId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.sessions.find_in_scope(id, scope).await
    }

    async fn find_active_by_issued_session(
        &self,
        issued_session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.sessions
            .find_active_by_issued_session(issued_session_id, now)
            .await
    }

    async fn get_active(
        &self,
        impersonator_id: UserId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.sessions.find_active_for(impersonator_id, scope).await
    }

    async fn end_session(
        &self,
        id: ImpersonationId,
        ended_at: DateTime<Utc>,
        reason: &EndReason,
    ) -> AppResult<Option<ImpersonationSession>> {
        self.sessions.end_session(id, ended_at, reason.as_str()).await
    }

    async fn list_sessions(
        &self,
        scope: &TenantScope,
        filter: &SessionFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<ImpersonationSession>> {
        self.sessions.search(scope, filter, page, now).await
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ImpersonationSession>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.sessions.find_expired(now, limit).await
    }

    async fn create_audit_event(&self, event: &AuditEvent) -> AppResult<()> {
        self.audit.create(event).await
    }

    async fn list_audit_events(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>> {
        self.audit.search(scope, filter, page).await
    }

    async fn count_audit_events(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEventCount>> {
        self.audit.count_by_type(scope, from, to).await
    }
}
