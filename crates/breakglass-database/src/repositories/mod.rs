//! Repository implementations for all Breakglass tables.

pub mod audit;
pub mod impersonation;
pub mod user;
pub mod user_session;

pub use audit::ImpersonationAuditRepository;
pub use impersonation::ImpersonationSessionRepository;
pub use user::UserRepository;
pub use user_session::UserSessionRepository;

use breakglass_core::types::PageRequest;

/// Tenant-scope predicate over `app_id`, `environment_id` and
/// `organization_id`, binding three parameters starting at `$first`.
pub(crate) fn scope_clause(first: u32) -> String {
    format!(
        "app_id = ${first} AND environment_id IS NOT DISTINCT FROM ${} \
         AND organization_id IS NOT DISTINCT FROM ${}",
        first + 1,
        first + 2
    )
}

/// `(LIMIT, OFFSET)` for binding as `BIGINT`; values past `i64::MAX`
/// saturate so PostgreSQL sees an empty page rather than a negative offset.
pub(crate) fn page_bounds(page: &PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_clause_numbers_parameters() {
        let clause = scope_clause(2);
        assert!(clause.starts_with("app_id = $2"));
        assert!(clause.contains("environment_id IS NOT DISTINCT FROM $3"));
        assert!(clause.ends_with("organization_id IS NOT DISTINCT FROM $4"));
    }

    #[test]
    fn test_page_bounds_saturate_huge_pages() {
        let (limit, offset) = page_bounds(&PageRequest::new(u64::MAX, 100));
        assert_eq!(limit, 100);
        assert_eq!(offset, i64::MAX);

        assert_eq!(page_bounds(&PageRequest::new(3, 10)), (10, 20));
    }
}
