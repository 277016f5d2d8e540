//! The persistence contract of the impersonation subsystem.
//!
//! Implementations must make "no row flagged active for this impersonator
//! in this scope" and the following insert a single atomic step:
//! [`ImpersonationRepository::create`] fails with
//! [`ErrorKind::AlreadyImpersonating`](breakglass_core::ErrorKind::AlreadyImpersonating)
//! instead of admitting a second active row.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope, UserId};
use breakglass_entity::audit::{AuditEvent, AuditEventCount, AuditFilter};
use breakglass_entity::impersonation::{EndReason, ImpersonationSession, SessionFilter};

pub use memory::MemoryImpersonationRepository;
pub use postgres::PgImpersonationStore;

/// Storage for impersonation sessions and their audit trail.
#[async_trait]
pub trait ImpersonationRepository: Send + Sync + 'static {
    /// Insert a new session. Fails with `AlreadyImpersonating` if another
    /// row is flagged active for the same impersonator and scope.
    async fn create(&self, session: &ImpersonationSession) -> AppResult<()>;

    /// Insert a session together with its first audit event. Either both
    /// rows are written or neither is.
    async fn create_with_audit(
        &self,
        session: &ImpersonationSession,
        event: &AuditEvent,
    ) -> AppResult<()> {
        self.create(session).await?;
        self.create_audit_event(event).await
    }

    /// Point lookup within a tenant scope.
    async fn get(
        &self,
        id: ImpersonationId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>>;

    /// The effectively active session bound to an issued session ID.
    async fn find_active_by_issued_session(
        &self,
        issued_session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ImpersonationSession>>;

    /// The row flagged active for an impersonator in a scope, which may be
    /// past its deadline.
    async fn get_active(
        &self,
        impersonator_id: UserId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>>;

    /// Compare-and-swap out of the active state. Returns the updated row
    /// only to the caller that performed the transition.
    async fn end_session(
        &self,
        id: ImpersonationId,
        ended_at: DateTime<Utc>,
        reason: &EndReason,
    ) -> AppResult<Option<ImpersonationSession>>;

    /// Sessions in a scope, newest first, with expiry-aware `active_only`.
    async fn list_sessions(
        &self,
        scope: &TenantScope,
        filter: &SessionFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<ImpersonationSession>>;

    /// Up to `limit` rows flagged active whose deadline is at or before
    /// `now`, across all tenants.
    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ImpersonationSession>>;

    /// Append an audit event.
    async fn create_audit_event(&self, event: &AuditEvent) -> AppResult<()>;

    /// Audit events in a scope, newest first.
    async fn list_audit_events(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>>;

    /// Per-type event counts in `[from, to)` within a scope.
    async fn count_audit_events(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEventCount>>;
}
