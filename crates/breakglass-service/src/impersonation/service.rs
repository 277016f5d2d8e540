//! The impersonation state machine.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use breakglass_auth::directory::UserLookup;
use breakglass_auth::rbac::{Authorizer, ResourceDescriptor};
use breakglass_auth::session::SessionIssuer;
use breakglass_core::config::ImpersonationConfig;
use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope, UserId};
use breakglass_database::store::ImpersonationRepository;
use breakglass_entity::audit::AuditEvent;
use breakglass_entity::impersonation::{EndReason, ImpersonationSession, IssuedSession};
use breakglass_entity::user::User;

use super::request::{EndRequest, ListRequest, StartRequest};
use super::response::{EndResponse, StartResponse, VerifyResponse};
use crate::audit::{ActionRecord, AuditTrail};

/// Rows fetched per round by [`ImpersonationService::expire_sessions`].
const EXPIRY_BATCH_SIZE: usize = 500;

/// Starts, ends, looks up and expires impersonations.
///
/// Holds no mutable state; all of it lives in the repository, which
/// also enforces one active impersonation per actor and tenant.
#[derive(Clone)]
pub struct ImpersonationService {
    config: ImpersonationConfig,
    repo: Arc<dyn ImpersonationRepository>,
    users: Arc<dyn UserLookup>,
    sessions: Arc<dyn SessionIssuer>,
    authorizer: Arc<dyn Authorizer>,
    audit: AuditTrail,
}

impl std::fmt::Debug for ImpersonationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpersonationService")
            .field("config", &self.config)
            .field("audit", &self.audit)
            .finish()
    }
}

impl ImpersonationService {
    /// Creates a new impersonation service.
    ///
    /// `config` should already have passed [`ImpersonationConfig::validate`].
    pub fn new(
        config: ImpersonationConfig,
        repo: Arc<dyn ImpersonationRepository>,
        users: Arc<dyn UserLookup>,
        sessions: Arc<dyn SessionIssuer>,
        authorizer: Arc<dyn Authorizer>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            config,
            repo,
            users,
            sessions,
            authorizer,
            audit,
        }
    }

    /// The active policy.
    pub fn config(&self) -> &ImpersonationConfig {
        &self.config
    }

    /// The audit trail this service writes to.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Begin impersonating `req.target_user_id`.
    ///
    /// Every check runs before any side effect. Side effects then happen
    /// in order: mint the target session, persist the impersonation with
    /// its `started` event, forward the event.
    pub async fn start(&self, req: StartRequest) -> AppResult<StartResponse> {
        if req.target_user_id == req.impersonator_id {
            return Err(AppError::cannot_impersonate_self());
        }

        let duration_minutes = self.effective_duration(req.duration_minutes)?;
        let reason = self.validate_reason(&req.reason)?;
        let ticket_number = self.validate_ticket(req.ticket_number.as_deref())?;

        if self.config.require_permission {
            let resource = ResourceDescriptor::user(req.target_user_id, req.scope);
            let decision = self
                .authorizer
                .evaluate(
                    req.impersonator_id,
                    &self.config.impersonate_permission_name,
                    &resource,
                )
                .await?;
            if !decision.is_allowed() {
                warn!(
                    impersonator_id = %req.impersonator_id,
                    target_user_id = %req.target_user_id,
                    app_id = %req.scope.app_id,
                    permission = %self.config.impersonate_permission_name,
                    "Impersonation denied by authorizer"
                );
                return Err(AppError::permission_denied(format!(
                    "Missing permission '{}'",
                    self.config.impersonate_permission_name
                )));
            }
        }

        self.require_user(req.impersonator_id, "Impersonator").await?;
        let target = self.require_user(req.target_user_id, "Target user").await?;

        let now = Utc::now();
        self.ensure_not_impersonating(&req, now).await?;

        let ttl = Duration::minutes(i64::from(duration_minutes));
        let issued = self
            .sessions
            .create(target.id, ttl)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    "Failed to issue impersonation session",
                    e,
                )
            })?;

        let session = ImpersonationSession {
            id: ImpersonationId::new(),
            app_id: req.scope.app_id,
            environment_id: req.scope.environment_id,
            organization_id: req.scope.organization_id,
            impersonator_id: req.impersonator_id,
            target_user_id: target.id,
            issued_session_id: issued.session_id.clone(),
            session_token: issued.token.clone(),
            reason,
            ticket_number,
            ip_address: req.ip_address,
            user_agent: req.user_agent,
            metadata: req.metadata.unwrap_or_else(|| serde_json::json!({})),
            active: true,
            expires_at: now + ttl,
            ended_at: None,
            end_reason: None,
            created_at: now,
            updated_at: now,
        };
        let started = AuditTrail::started_event(&session, duration_minutes, now);

        if let Err(e) = self.repo.create_with_audit(&session, &started).await {
            self.discard_issued(&issued, &e).await;
            return Err(e);
        }
        self.audit.forward(&started).await;

        info!(
            impersonation_id = %session.id,
            impersonator_id = %session.impersonator_id,
            target_user_id = %session.target_user_id,
            app_id = %session.app_id,
            duration_minutes,
            expires_at = %session.expires_at,
            "Impersonation started"
        );

        Ok(StartResponse {
            impersonation_id: session.id,
            session_id: issued.session_id,
            session_token: issued.token,
            expires_at: session.expires_at,
            message: format!(
                "Now impersonating {} until {}",
                target.label(),
                session.expires_at.to_rfc3339()
            ),
        })
    }

    /// End an impersonation on behalf of its actor.
    ///
    /// Ending an impersonation that is already over succeeds without side
    /// effects and reports the original end time.
    pub async fn end(&self, req: EndRequest) -> AppResult<EndResponse> {
        let session = self
            .repo
            .get(req.impersonation_id, &req.scope)
            .await?
            .ok_or_else(AppError::impersonation_not_found)?;

        if session.impersonator_id != req.impersonator_id {
            warn!(
                impersonation_id = %session.id,
                claimed_impersonator_id = %req.impersonator_id,
                "Impersonation end attempted by another actor"
            );
            return Err(AppError::permission_denied(
                "Only the impersonator may end this impersonation",
            ));
        }

        if !session.active {
            return Ok(Self::already_ended(&session));
        }

        let now = Utc::now();
        let reason = EndReason::from_optional(req.reason.as_deref());
        let Some(ended) = self.repo.end_session(session.id, now, &reason).await? else {
            // Lost the race with the sweep or a concurrent end.
            let current = self
                .repo
                .get(session.id, &req.scope)
                .await?
                .ok_or_else(AppError::impersonation_not_found)?;
            return Ok(Self::already_ended(&current));
        };

        let session_revoked = match self.sessions.revoke(&ended.session_token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    impersonation_id = %ended.id,
                    issued_session_id = %ended.issued_session_id,
                    error = %e,
                    "Failed to revoke impersonation session"
                );
                false
            }
        };

        let event = AuditTrail::ended_event(&ended, session_revoked, now);
        self.record_transition(&ended, &event).await;

        info!(
            impersonation_id = %ended.id,
            impersonator_id = %ended.impersonator_id,
            target_user_id = %ended.target_user_id,
            end_reason = %reason,
            session_revoked,
            "Impersonation ended"
        );

        Ok(EndResponse {
            success: true,
            impersonation_id: ended.id,
            ended_at: now,
            session_revoked,
        })
    }

    /// Tenant-scoped point lookup.
    pub async fn get(
        &self,
        scope: &TenantScope,
        id: ImpersonationId,
    ) -> AppResult<ImpersonationSession> {
        self.repo
            .get(id, scope)
            .await?
            .ok_or_else(AppError::impersonation_not_found)
    }

    /// Tenant-scoped paginated listing, newest first.
    pub async fn list(&self, req: ListRequest) -> AppResult<PageResponse<ImpersonationSession>> {
        let page = PageRequest::new(req.page.page, req.page.page_size);
        self.repo
            .list_sessions(&req.scope, &req.filter, &page, Utc::now())
            .await
    }

    /// Whether `issued_session_id` is the session of an effectively active
    /// impersonation. Absence is a normal outcome, not an error.
    pub async fn verify(&self, issued_session_id: &str) -> AppResult<VerifyResponse> {
        if issued_session_id.is_empty() {
            return Ok(VerifyResponse::not_impersonating());
        }
        let found = self
            .repo
            .find_active_by_issued_session(issued_session_id, Utc::now())
            .await?;

        Ok(match found {
            Some(session) => {
                let indicator = self
                    .config
                    .show_indicator
                    .then(|| self.config.indicator_message.clone());
                VerifyResponse::impersonating(&session, indicator)
            }
            None => VerifyResponse::not_impersonating(),
        })
    }

    /// Close every impersonation past its deadline.
    ///
    /// Each row is handled on its own: a failure is logged and the sweep
    /// moves on. Returns the number of rows this call transitioned.
    pub async fn expire_sessions(&self) -> AppResult<u64> {
        let now = Utc::now();
        let mut expired = 0u64;

        loop {
            let batch = self.repo.find_expired(now, EXPIRY_BATCH_SIZE).await?;
            let fetched = batch.len();
            let mut transitioned = 0u64;

            for session in &batch {
                match self.expire_one(session, now).await {
                    Ok(true) => transitioned += 1,
                    Ok(false) => {
                        debug!(impersonation_id = %session.id, "Already closed by another writer");
                    }
                    Err(e) => {
                        error!(
                            impersonation_id = %session.id,
                            error = %e,
                            "Failed to expire impersonation"
                        );
                    }
                }
            }

            expired += transitioned;
            if fetched < EXPIRY_BATCH_SIZE || transitioned == 0 {
                break;
            }
        }

        if expired > 0 {
            info!(count = expired, "Expired impersonation sessions");
        }
        Ok(expired)
    }

    /// Record an action taken while impersonating.
    pub async fn audit_action(
        &self,
        scope: &TenantScope,
        record: ActionRecord,
    ) -> AppResult<Option<AuditEvent>> {
        self.audit.record_action(scope, record).await
    }

    fn effective_duration(&self, requested: Option<u32>) -> AppResult<u32> {
        match requested {
            None | Some(0) => Ok(self.config.default_duration_minutes),
            Some(minutes) if self.config.duration_in_bounds(minutes) => Ok(minutes),
            Some(minutes) => Err(AppError::invalid_duration(format!(
                "Duration {minutes} minutes is outside [{}, {}]",
                self.config.min_duration_minutes, self.config.max_duration_minutes
            ))),
        }
    }

    fn validate_reason(&self, reason: &str) -> AppResult<String> {
        let reason = reason.trim();
        let length = reason.chars().count();
        if self.config.require_reason && length < self.config.min_reason_length {
            return Err(AppError::invalid_reason(format!(
                "Reason must be at least {} characters",
                self.config.min_reason_length
            )));
        }
        if length > self.config.max_reason_length {
            return Err(AppError::invalid_reason(format!(
                "Reason must be at most {} characters",
                self.config.max_reason_length
            )));
        }
        Ok(reason.to_string())
    }

    fn validate_ticket(&self, ticket: Option<&str>) -> AppResult<Option<String>> {
        let ticket = ticket.map(str::trim).filter(|t| !t.is_empty());
        if self.config.require_ticket && ticket.is_none() {
            return Err(AppError::invalid_reason("A ticket number is required"));
        }
        Ok(ticket.map(String::from))
    }

    async fn require_user(
        &self,
        id: UserId,
        role: &str,
    ) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::user_not_found(format!("{role} {id} not found")))
    }

    /// Fail if the actor already holds a usable impersonation in this
    /// scope. A row left active past its deadline is expired first so it
    /// does not block the new one.
    async fn ensure_not_impersonating(
        &self,
        req: &StartRequest,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let Some(existing) = self.repo.get_active(req.impersonator_id, &req.scope).await? else {
            return Ok(());
        };
        if existing.is_effectively_active(now) {
            return Err(AppError::already_impersonating(format!(
                "Impersonation {} is still active until {}",
                existing.id,
                existing.expires_at.to_rfc3339()
            )));
        }
        self.expire_one(&existing, now).await?;
        Ok(())
    }

    /// Move one stale row to `timeout` and audit it. `Ok(false)` when
    /// another writer closed it first.
    async fn expire_one(
        &self,
        session: &ImpersonationSession,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(expired) = self
            .repo
            .end_session(session.id, now, &EndReason::Timeout)
            .await?
        else {
            return Ok(false);
        };

        let event = AuditTrail::expired_event(&expired, now);
        self.record_transition(&expired, &event).await;

        info!(
            impersonation_id = %expired.id,
            impersonator_id = %expired.impersonator_id,
            app_id = %expired.app_id,
            expires_at = %expired.expires_at,
            "Impersonation expired"
        );
        Ok(true)
    }

    /// Audit a committed transition. The state change stands even if the
    /// audit write fails, so the failure is logged with enough context to
    /// reconcile.
    async fn record_transition(&self, session: &ImpersonationSession, event: &AuditEvent) {
        if let Err(e) = self.audit.record(event).await {
            error!(
                impersonation_id = %session.id,
                event_id = %event.id,
                event_type = %event.event_type,
                details = %event.details,
                error = %e,
                "Failed to record audit event for committed transition"
            );
        }
    }

    /// Revoke a session minted for a start that could not be persisted.
    async fn discard_issued(&self, issued: &IssuedSession, cause: &AppError) {
        match self.sessions.revoke(&issued.token).await {
            Ok(()) => debug!(
                issued_session_id = %issued.session_id,
                cause = %cause,
                "Revoked session of failed impersonation start"
            ),
            Err(e) => error!(
                issued_session_id = %issued.session_id,
                cause = %cause,
                error = %e,
                "Failed to revoke session of failed impersonation start"
            ),
        }
    }

    fn already_ended(session: &ImpersonationSession) -> EndResponse {
        EndResponse {
            success: true,
            impersonation_id: session.id,
            ended_at: session.ended_at.unwrap_or(session.updated_at),
            session_revoked: false,
        }
    }
}
