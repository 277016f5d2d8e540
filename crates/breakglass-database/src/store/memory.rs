//! In-memory impersonation store using a Tokio mutex.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use breakglass_core::error::AppError;
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope, UserId};
use breakglass_entity::audit::{AuditEvent, AuditEventCount, AuditEventType, AuditFilter};
use breakglass_entity::impersonation::{EndReason, ImpersonationSession, SessionFilter};

use super::ImpersonationRepository;

#[derive(Debug, Default)]
struct InnerState {
    sessions: BTreeMap<ImpersonationId, ImpersonationSession>,
    events: Vec<AuditEvent>,
}

impl InnerState {
    /// Same rule as the `uq_impersonation_one_active` index.
    fn check_insertable(&self, session: &ImpersonationSession) -> AppResult<()> {
        if self.sessions.contains_key(&session.id) {
            return Err(AppError::database(format!(
                "Impersonation {} already exists",
                session.id
            )));
        }
        let conflict = session.active
            && self.sessions.values().any(|existing| {
                existing.active
                    && existing.impersonator_id == session.impersonator_id
                    && existing.scope() == session.scope()
            });
        if conflict {
            return Err(AppError::already_impersonating(
                "An impersonation is already active for this actor in this scope",
            ));
        }
        Ok(())
    }

    fn check_event(&self, event: &AuditEvent) -> AppResult<()> {
        if self.sessions.contains_key(&event.impersonation_id) {
            Ok(())
        } else {
            Err(AppError::database(format!(
                "Audit event references unknown impersonation {}",
                event.impersonation_id
            )))
        }
    }
}

/// [`ImpersonationRepository`] held in process memory.
///
/// Every operation runs under one mutex, so check-and-insert is atomic.
/// Suitable for tests and single-node embedding only.
#[derive(Debug, Clone, Default)]
pub struct MemoryImpersonationRepository {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryImpersonationRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored session, in ID order.
    pub async fn all_sessions(&self) -> Vec<ImpersonationSession> {
        self.state.lock().await.sessions.values().cloned().collect()
    }

    /// Snapshot of every stored audit event, in insertion order.
    pub async fn all_events(&self) -> Vec<AuditEvent> {
        self.state.lock().await.events.clone()
    }
}

fn paginate<T>(mut items: Vec<T>, page: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..).take(limit).collect()
    };
    PageResponse::new(items, *page, total)
}

#[async_trait]
impl ImpersonationRepository for MemoryImpersonationRepository {
    async fn create(&self, session: &ImpersonationSession) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.check_insertable(session)?;
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn create_with_audit(
        &self,
        session: &ImpersonationSession,
        event: &AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.check_insertable(session)?;
        if event.impersonation_id != session.id {
            return Err(AppError::database(
                "Audit event does not reference the inserted impersonation",
            ));
        }
        state.sessions.insert(session.id, session.clone());
        state.events.push(event.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: ImpersonationId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(&id).filter(|s| s.in_scope(scope)).cloned())
    }

    async fn find_active_by_issued_session(
        &self,
        issued_session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ImpersonationSession>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.issued_session_id == issued_session_id && s.is_effectively_active(now))
            .cloned())
    }

    async fn get_active(
        &self,
        impersonator_id: UserId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.active && s.impersonator_id == impersonator_id && s.in_scope(scope))
            .cloned())
    }

    async fn end_session(
        &self,
        id: ImpersonationId,
        ended_at: DateTime<Utc>,
        reason: &EndReason,
    ) -> AppResult<Option<ImpersonationSession>> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&id).filter(|s| s.active) else {
            return Ok(None);
        };
        session.active = false;
        session.ended_at = Some(ended_at);
        session.end_reason = Some(reason.as_str().to_string());
        session.updated_at = ended_at;
        Ok(Some(session.clone()))
    }

    async fn list_sessions(
        &self,
        scope: &TenantScope,
        filter: &SessionFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<ImpersonationSession>> {
        let state = self.state.lock().await;
        let mut matches: Vec<ImpersonationSession> = state
            .sessions
            .values()
            .filter(|s| s.in_scope(scope))
            .filter(|s| !filter.active_only || s.is_effectively_active(now))
            .filter(|s| filter.impersonator_id.is_none_or(|id| s.impersonator_id == id))
            .filter(|s| filter.target_user_id.is_none_or(|id| s.target_user_id == id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matches, page))
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ImpersonationSession>> {
        let state = self.state.lock().await;
        let mut expired: Vec<ImpersonationSession> = state
            .sessions
            .values()
            .filter(|s| s.is_stale_active(now))
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.expires_at);
        expired.truncate(limit);
        Ok(expired)
    }

    async fn create_audit_event(&self, event: &AuditEvent) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.check_event(event)?;
        state.events.push(event.clone());
        Ok(())
    }

    async fn list_audit_events(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>> {
        let state = self.state.lock().await;
        let mut matches: Vec<AuditEvent> = state
            .events
            .iter()
            .filter(|e| e.scope() == *scope)
            .filter(|e| filter.matches(e.impersonation_id, e.event_type, e.created_at))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matches, page))
    }

    async fn count_audit_events(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEventCount>> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<AuditEventType, i64> = BTreeMap::new();
        for event in state
            .events
            .iter()
            .filter(|e| e.scope() == *scope && e.created_at >= from && e.created_at < to)
        {
            *counts.entry(event.event_type).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(event_type, count)| AuditEventCount { event_type, count })
            .collect())
    }
}
