//! Impersonation session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;

use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope, UserId};
use breakglass_entity::impersonation::{ImpersonationSession, SessionFilter};

use super::scope_clause;

/// Name of the unique partial index enforcing one active session per
/// impersonator and tenant scope.
pub const ONE_ACTIVE_INDEX: &str = "uq_impersonation_one_active";

/// Repository for `impersonation_sessions`.
#[derive(Debug, Clone)]
pub struct ImpersonationSessionRepository {
    pool: PgPool,
}

impl ImpersonationSessionRepository {
    /// Create a new impersonation session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a session by ID regardless of tenant. Operator tooling only.
    pub async fn find_by_id(&self, id: ImpersonationId) -> AppResult<Option<ImpersonationSession>> {
        sqlx::query_as::<_, ImpersonationSession>(
            "SELECT * FROM impersonation_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find impersonation session", e)
        })
    }

    /// Find a session by ID within a tenant scope.
    pub async fn find_in_scope(
        &self,
        id: ImpersonationId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        let sql = format!(
            "SELECT * FROM impersonation_sessions WHERE id = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_as::<_, ImpersonationSession>(&sql)
            .bind(id)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to find impersonation session",
                    e,
                )
            })
    }

    /// Find the effectively active session bound to an issued session ID.
    ///
    /// Served by the partial index on `issued_session_id WHERE active`.
    pub async fn find_active_by_issued_session(
        &self,
        issued_session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ImpersonationSession>> {
        sqlx::query_as::<_, ImpersonationSession>(
            "SELECT * FROM impersonation_sessions \
             WHERE issued_session_id = $1 AND active AND expires_at > $2 \
             LIMIT 1",
        )
        .bind(issued_session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to find impersonation by issued session",
                e,
            )
        })
    }

    /// Find the row flagged active for an impersonator in a scope.
    ///
    /// The unique index guarantees at most one. It may be past its
    /// deadline if the sweep has not reached it yet.
    pub async fn find_active_for(
        &self,
        impersonator_id: UserId,
        scope: &TenantScope,
    ) -> AppResult<Option<ImpersonationSession>> {
        let sql = format!(
            "SELECT * FROM impersonation_sessions WHERE impersonator_id = $1 AND active AND {}",
            scope_clause(2)
        );
        sqlx::query_as::<_, ImpersonationSession>(&sql)
            .bind(impersonator_id)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to find active impersonation",
                    e,
                )
            })
    }

    /// List sessions in a scope, newest first.
    pub async fn search(
        &self,
        scope: &TenantScope,
        filter: &SessionFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<ImpersonationSession>> {
        let mut conditions = vec![scope_clause(1)];
        let mut param_idx = 4u32;

        if filter.active_only {
            conditions.push(format!("active AND expires_at > ${param_idx}"));
            param_idx += 1;
        }
        if filter.impersonator_id.is_some() {
            conditions.push(format!("impersonator_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.target_user_id.is_some() {
            conditions.push(format!("target_user_id = ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = conditions.join(" AND ");
        let count_sql = format!("SELECT COUNT(*) FROM impersonation_sessions WHERE {where_clause}");
        let select_sql = format!(
            "SELECT * FROM impersonation_sessions WHERE {where_clause} \
             ORDER BY created_at DESC, id DESC LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id);
        let mut select_query = sqlx::query_as::<_, ImpersonationSession>(&select_sql)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id);

        if filter.active_only {
            count_query = count_query.bind(now);
            select_query = select_query.bind(now);
        }
        if let Some(impersonator_id) = filter.impersonator_id {
            count_query = count_query.bind(impersonator_id);
            select_query = select_query.bind(impersonator_id);
        }
        if let Some(target_user_id) = filter.target_user_id {
            count_query = count_query.bind(target_user_id);
            select_query = select_query.bind(target_user_id);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count impersonations", e)
        })?;

        let (limit, offset) = super::page_bounds(page);
        let sessions = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list impersonations", e)
            })?;

        Ok(PageResponse::new(sessions, *page, total.max(0) as u64))
    }

    /// Rows still flagged active whose deadline is at or before `now`,
    /// oldest deadline first.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<ImpersonationSession>> {
        sqlx::query_as::<_, ImpersonationSession>(
            "SELECT * FROM impersonation_sessions \
             WHERE active AND expires_at <= $1 \
             ORDER BY expires_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expired impersonations", e)
        })
    }

    /// Insert a new session.
    pub async fn create(&self, session: &ImpersonationSession) -> AppResult<()> {
        insert_query(session)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        Ok(())
    }

    /// Move a session out of the active state.
    ///
    /// Compare-and-swap on `active`: returns the updated row only if this
    /// call performed the transition, `None` if the row was already
    /// inactive or does not exist.
    pub async fn end_session(
        &self,
        id: ImpersonationId,
        ended_at: DateTime<Utc>,
        end_reason: &str,
    ) -> AppResult<Option<ImpersonationSession>> {
        sqlx::query_as::<_, ImpersonationSession>(
            "UPDATE impersonation_sessions \
             SET active = FALSE, ended_at = $2, end_reason = $3, updated_at = $2 \
             WHERE id = $1 AND active \
             RETURNING *",
        )
        .bind(id)
        .bind(ended_at)
        .bind(end_reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to end impersonation session", e)
        })
    }
}

/// Build the `INSERT` for a session, for use on a pool or a transaction.
pub(crate) fn insert_query(session: &ImpersonationSession) -> Query<'_, sqlx::Postgres, PgArguments> {
    sqlx::query(
        "INSERT INTO impersonation_sessions \
         (id, app_id, environment_id, organization_id, impersonator_id, target_user_id, \
          issued_session_id, session_token, reason, ticket_number, ip_address, user_agent, \
          metadata, active, expires_at, ended_at, end_reason, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
    )
    .bind(session.id)
    .bind(session.app_id)
    .bind(session.environment_id)
    .bind(session.organization_id)
    .bind(session.impersonator_id)
    .bind(session.target_user_id)
    .bind(&session.issued_session_id)
    .bind(&session.session_token)
    .bind(&session.reason)
    .bind(&session.ticket_number)
    .bind(&session.ip_address)
    .bind(&session.user_agent)
    .bind(&session.metadata)
    .bind(session.active)
    .bind(session.expires_at)
    .bind(session.ended_at)
    .bind(&session.end_reason)
    .bind(session.created_at)
    .bind(session.updated_at)
}

/// Map an insert failure, turning a violation of the one-active index
/// into [`ErrorKind::AlreadyImpersonating`].
pub(crate) fn map_insert_error(err: sqlx::Error) -> AppError {
    let violates_one_active = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some(ONE_ACTIVE_INDEX));

    if violates_one_active {
        AppError::already_impersonating(
            "An impersonation is already active for this actor in this scope",
        )
    } else {
        AppError::with_source(
            ErrorKind::Database,
            "Failed to create impersonation session",
            err,
        )
    }
}
