//! Impersonation audit event repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;

use breakglass_core::error::{AppError, ErrorKind};
use breakglass_core::result::AppResult;
use breakglass_core::types::{ImpersonationId, PageRequest, PageResponse, TenantScope};
use breakglass_entity::audit::{AuditEvent, AuditEventCount, AuditFilter};

use super::scope_clause;

/// Repository for the append-only `impersonation_audit_events` table.
#[derive(Debug, Clone)]
pub struct ImpersonationAuditRepository {
    pool: PgPool,
}

impl ImpersonationAuditRepository {
    /// Create a new audit repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an event.
    pub async fn create(&self, event: &AuditEvent) -> AppResult<()> {
        insert_query(event).execute(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create audit event", e)
        })?;
        Ok(())
    }

    /// All events of one impersonation, oldest first.
    pub async fn find_by_impersonation(&self, id: ImpersonationId) -> AppResult<Vec<AuditEvent>> {
        sqlx::query_as::<_, AuditEvent>(
            "SELECT * FROM impersonation_audit_events \
             WHERE impersonation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load audit trail", e))
    }

    /// Search events in a scope, newest first.
    pub async fn search(
        &self,
        scope: &TenantScope,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditEvent>> {
        let mut conditions = vec![scope_clause(1)];
        let mut param_idx = 4u32;

        if filter.impersonation_id.is_some() {
            conditions.push(format!("impersonation_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.event_type.is_some() {
            conditions.push(format!("event_type = ${param_idx}"));
            param_idx += 1;
        }
        if filter.from.is_some() {
            conditions.push(format!("created_at >= ${param_idx}"));
            param_idx += 1;
        }
        if filter.to.is_some() {
            conditions.push(format!("created_at < ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = conditions.join(" AND ");
        let count_sql =
            format!("SELECT COUNT(*) FROM impersonation_audit_events WHERE {where_clause}");
        let select_sql = format!(
            "SELECT * FROM impersonation_audit_events WHERE {where_clause} \
             ORDER BY created_at DESC, id DESC LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id);
        let mut select_query = sqlx::query_as::<_, AuditEvent>(&select_sql)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id);

        if let Some(id) = filter.impersonation_id {
            count_query = count_query.bind(id);
            select_query = select_query.bind(id);
        }
        if let Some(event_type) = filter.event_type {
            count_query = count_query.bind(event_type);
            select_query = select_query.bind(event_type);
        }
        if let Some(from) = filter.from {
            count_query = count_query.bind(from);
            select_query = select_query.bind(from);
        }
        if let Some(to) = filter.to {
            count_query = count_query.bind(to);
            select_query = select_query.bind(to);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count audit events", e)
        })?;

        let (limit, offset) = super::page_bounds(page);
        let events = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to search audit events", e)
            })?;

        Ok(PageResponse::new(events, *page, total.max(0) as u64))
    }

    /// Count events per type in `[from, to)` within a scope.
    pub async fn count_by_type(
        &self,
        scope: &TenantScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEventCount>> {
        let sql = format!(
            "SELECT event_type, COUNT(*) AS count FROM impersonation_audit_events \
             WHERE {} AND created_at >= $4 AND created_at < $5 \
             GROUP BY event_type ORDER BY event_type",
            scope_clause(1)
        );
        sqlx::query_as::<_, AuditEventCount>(&sql)
            .bind(scope.app_id)
            .bind(scope.environment_id)
            .bind(scope.organization_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count audit events", e)
            })
    }
}

/// Build the `INSERT` for an event, for use on a pool or a transaction.
pub(crate) fn insert_query(event: &AuditEvent) -> Query<'_, sqlx::Postgres, PgArguments> {
    sqlx::query(
        "INSERT INTO impersonation_audit_events \
         (id, impersonation_id, app_id, environment_id, organization_id, event_type, \
          action, resource, ip_address, user_agent, details, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(event.id)
    .bind(event.impersonation_id)
    .bind(event.app_id)
    .bind(event.environment_id)
    .bind(event.organization_id)
    .bind(event.event_type)
    .bind(&event.action)
    .bind(&event.resource)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .bind(&event.details)
    .bind(event.created_at)
}
