//! Expiry sweeper: periodically closes impersonations past their deadline.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use breakglass_service::ImpersonationService;

/// Runs [`ImpersonationService::expire_sessions`] on a fixed interval.
///
/// The first sweep runs as soon as the loop starts. A sweep in progress
/// always completes before a shutdown signal is observed, and ticks missed
/// while a sweep overran are skipped rather than replayed.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    service: ImpersonationService,
    interval: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper running every `interval`.
    pub fn new(service: ImpersonationService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Create a sweeper using the service's `cleanup_interval_minutes`.
    pub fn from_config(service: ImpersonationService) -> Self {
        let interval = service.config().cleanup_interval();
        Self::new(service, interval)
    }

    /// Time between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `cancel` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Expiry sweeper received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// Run one sweep and return how many impersonations it closed.
    ///
    /// Errors are logged; the next tick tries again.
    pub async fn sweep_once(&self) -> u64 {
        match self.service.expire_sessions().await {
            Ok(count) => {
                debug!(count, "Expiry sweep finished");
                count
            }
            Err(e) => {
                error!(error = %e, "Expiry sweep failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use breakglass_auth::directory::UserLookup;
    use breakglass_auth::rbac::{Authorizer, Decision, ResourceDescriptor};
    use breakglass_auth::session::SessionIssuer;
    use breakglass_core::config::ImpersonationConfig;
    use breakglass_core::error::AppError;
    use breakglass_core::result::AppResult;
    use breakglass_core::types::{AppId, ImpersonationId, UserId};
    use breakglass_database::store::{ImpersonationRepository, MemoryImpersonationRepository};
    use breakglass_entity::impersonation::{ImpersonationSession, IssuedSession};
    use breakglass_entity::user::User;
    use breakglass_service::AuditTrail;

    use super::*;

    struct NoUsers;

    #[async_trait]
    impl UserLookup for NoUsers {
        async fn find_by_id(&self, _id: UserId) -> AppResult<Option<User>> {
            Ok(None)
        }
    }

    struct NoSessions;

    #[async_trait]
    impl SessionIssuer for NoSessions {
        async fn create(
            &self,
            _user_id: UserId,
            _ttl: chrono::Duration,
        ) -> AppResult<IssuedSession> {
            Err(AppError::external_service("not available in tests"))
        }

        async fn revoke(&self, _token: &str) -> AppResult<()> {
            Ok(())
        }
    }

    struct DenyAll;

    #[async_trait]
    impl Authorizer for DenyAll {
        async fn evaluate(
            &self,
            _actor_id: UserId,
            _permission: &str,
            _resource: &ResourceDescriptor,
        ) -> AppResult<Decision> {
            Ok(Decision::Deny)
        }
    }

    fn service(repo: &MemoryImpersonationRepository) -> ImpersonationService {
        let repo: Arc<dyn ImpersonationRepository> = Arc::new(repo.clone());
        let audit = AuditTrail::new(repo.clone(), None, true);
        ImpersonationService::new(
            ImpersonationConfig::default(),
            repo,
            Arc::new(NoUsers),
            Arc::new(NoSessions),
            Arc::new(DenyAll),
            audit,
        )
    }

    async fn seed_stale(repo: &MemoryImpersonationRepository) -> ImpersonationId {
        let created_at = Utc::now() - chrono::Duration::hours(1);
        let session = ImpersonationSession {
            id: ImpersonationId::new(),
            app_id: AppId::new(),
            environment_id: None,
            organization_id: None,
            impersonator_id: UserId::new(),
            target_user_id: UserId::new(),
            issued_session_id: uuid::Uuid::new_v4().to_string(),
            session_token: "token".to_string(),
            reason: "Investigating a billing dispute".to_string(),
            ticket_number: None,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::json!({}),
            active: true,
            expires_at: created_at + chrono::Duration::minutes(5),
            ended_at: None,
            end_reason: None,
            created_at,
            updated_at: created_at,
        };
        repo.create(&session).await.unwrap();
        session.id
    }

    async fn active_count(repo: &MemoryImpersonationRepository) -> usize {
        repo.all_sessions().await.iter().filter(|s| s.active).count()
    }

    #[tokio::test]
    async fn test_sweep_once_reports_closed_count() {
        let repo = MemoryImpersonationRepository::new();
        seed_stale(&repo).await;
        seed_stale(&repo).await;
        let sweeper = ExpirySweeper::new(service(&repo), Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once().await, 2);
        assert_eq!(sweeper.sweep_once().await, 0);
        assert_eq!(active_count(&repo).await, 0);
    }

    #[test]
    fn test_interval_comes_from_config() {
        let repo = MemoryImpersonationRepository::new();
        let sweeper = ExpirySweeper::from_config(service(&repo));
        assert_eq!(sweeper.interval(), Duration::from_secs(15 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_on_each_tick_until_cancelled() {
        let repo = MemoryImpersonationRepository::new();
        seed_stale(&repo).await;
        let sweeper = ExpirySweeper::new(service(&repo), Duration::from_secs(60));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { sweeper.run(cancel_rx).await });

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(active_count(&repo).await, 0);

        seed_stale(&repo).await;
        assert_eq!(active_count(&repo).await, 1);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(active_count(&repo).await, 0);

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_sender_dropped() {
        let repo = MemoryImpersonationRepository::new();
        let sweeper = ExpirySweeper::new(service(&repo), Duration::from_secs(60));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { sweeper.run(cancel_rx).await });
        time::sleep(Duration::from_secs(1)).await;
        drop(cancel_tx);

        time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper stops")
            .unwrap();
    }
}
