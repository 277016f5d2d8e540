//! Tests for the impersonation lifecycle.

mod helpers;

use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};

use breakglass_core::config::ImpersonationConfig;
use breakglass_core::error::ErrorKind;
use breakglass_core::types::{AppId, ImpersonationId, PageRequest, TenantScope, UserId};
use breakglass_entity::audit::AuditEventType;
use breakglass_entity::impersonation::SessionFilter;
use breakglass_service::{EndRequest, ListRequest, StartRequest};
use helpers::{REASON, TestApp};

fn start_request(app: &TestApp) -> StartRequest {
    StartRequest::new(app.scope, app.agent.id, app.customer.id, REASON)
}

fn end_request(app: &TestApp, id: ImpersonationId) -> EndRequest {
    EndRequest {
        scope: app.scope,
        impersonation_id: id,
        impersonator_id: app.agent.id,
        reason: None,
    }
}

#[tokio::test]
async fn test_start_issues_session_and_records_started_event() {
    let app = TestApp::new();

    let req = StartRequest::new(
        app.scope,
        app.agent.id,
        app.customer.id,
        "Investigating ticket 123",
    )
    .with_duration(60);
    let before = Utc::now();
    let started = app.service.start(req).await.unwrap();

    let expected = before + Duration::minutes(60);
    assert!((started.expires_at - expected).num_seconds().abs() < 60);
    assert!(!started.session_token.is_empty());
    assert!(started.message.contains("customer@example.test"));

    let sessions = app.sessions().await;
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session.id, started.impersonation_id);
    assert!(session.active);
    assert_eq!(session.issued_session_id, started.session_id);
    assert_eq!(session.duration_minutes(), 60);
    assert_eq!(session.expires_at, started.expires_at);

    let minted = app.issuer.minted();
    assert_eq!(minted.len(), 1);
    assert_eq!(minted[0].user_id, app.customer.id);

    let events = app.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, AuditEventType::Started);
    assert_eq!(events[0].details["duration_minutes"], 60);
    assert_eq!(app.sink.events().len(), 1);
}

#[tokio::test]
async fn test_zero_or_missing_duration_uses_default() {
    let app = TestApp::new();

    let started = app
        .service
        .start(start_request(&app).with_duration(0))
        .await
        .unwrap();

    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert_eq!(session.duration_minutes(), 30);
}

#[tokio::test]
async fn test_duration_outside_bounds_is_rejected() {
    let app = TestApp::new();

    let err = app
        .service
        .start(start_request(&app).with_duration(1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidDuration);

    let config = ImpersonationConfig {
        min_duration_minutes: 5,
        ..ImpersonationConfig::default()
    };
    let app = TestApp::with_config(config);
    let err = app
        .service
        .start(start_request(&app).with_duration(3))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidDuration);
    assert!(app.issuer.minted().is_empty());
}

#[tokio::test]
async fn test_self_impersonation_is_rejected() {
    let app = TestApp::new();

    let req = StartRequest::new(app.scope, app.agent.id, app.agent.id, REASON);
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::CannotImpersonateSelf);
    assert!(app.issuer.minted().is_empty());
    assert!(app.events().await.is_empty());
}

#[tokio::test]
async fn test_short_reason_is_rejected_after_trimming() {
    let app = TestApp::new();

    let req = StartRequest::new(app.scope, app.agent.id, app.customer.id, "   Short   ");
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidReason);
    assert!(app.sessions().await.is_empty());
}

#[tokio::test]
async fn test_overlong_reason_is_rejected() {
    let app = TestApp::new();

    let req = StartRequest::new(app.scope, app.agent.id, app.customer.id, "x".repeat(501));
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidReason);
}

#[tokio::test]
async fn test_reason_optional_when_not_required() {
    let config = ImpersonationConfig {
        require_reason: false,
        ..ImpersonationConfig::default()
    };
    let app = TestApp::with_config(config);

    let req = StartRequest::new(app.scope, app.agent.id, app.customer.id, "");
    assert!(app.service.start(req).await.is_ok());
}

#[tokio::test]
async fn test_ticket_required_by_policy() {
    let config = ImpersonationConfig {
        require_ticket: true,
        ..ImpersonationConfig::default()
    };
    let app = TestApp::with_config(config);

    let err = app.service.start(start_request(&app)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidReason);

    let err = app
        .service
        .start(start_request(&app).with_ticket("   "))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidReason);

    let started = app
        .service
        .start(start_request(&app).with_ticket(" SUP-4821 "))
        .await
        .unwrap();
    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert_eq!(session.ticket_number.as_deref(), Some("SUP-4821"));
}

#[tokio::test]
async fn test_actor_without_permission_is_denied() {
    let app = TestApp::new();
    let member = app.directory.add("member@example.test", &["member"]);

    let req = StartRequest::new(app.scope, member.id, app.customer.id, REASON);
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert!(app.issuer.minted().is_empty());
    assert!(app.sessions().await.is_empty());
}

#[tokio::test]
async fn test_permission_check_can_be_disabled() {
    let config = ImpersonationConfig {
        require_permission: false,
        ..ImpersonationConfig::default()
    };
    let app = TestApp::with_config(config);
    let member = app.directory.add("member@example.test", &["member"]);

    let req = StartRequest::new(app.scope, member.id, app.customer.id, REASON);
    assert!(app.service.start(req).await.is_ok());
}

#[tokio::test]
async fn test_wildcard_role_may_impersonate() {
    let app = TestApp::new();
    let admin = app.directory.add("root@support.test", &["Admin"]);

    let req = StartRequest::new(app.scope, admin.id, app.customer.id, REASON);
    assert!(app.service.start(req).await.is_ok());
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let app = TestApp::new();

    let req = StartRequest::new(app.scope, app.agent.id, UserId::new(), REASON);
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::UserNotFound);
    assert!(app.issuer.minted().is_empty());
}

#[tokio::test]
async fn test_second_start_in_same_scope_conflicts() {
    let app = TestApp::new();
    app.service.start(start_request(&app)).await.unwrap();

    let other = app.directory.add("other@example.test", &["member"]);
    let req = StartRequest::new(app.scope, app.agent.id, other.id, REASON);
    let err = app.service.start(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::AlreadyImpersonating);
    assert!(err.kind.is_retryable());
    assert_eq!(app.issuer.minted().len(), 1);
}

#[tokio::test]
async fn test_start_in_another_scope_is_independent() {
    let app = TestApp::new();
    app.service.start(start_request(&app)).await.unwrap();

    let elsewhere = TenantScope::app(AppId::new());
    let req = StartRequest::new(elsewhere, app.agent.id, app.customer.id, REASON);
    assert!(app.service.start(req).await.is_ok());
    assert_eq!(app.sessions().await.len(), 2);
}

#[tokio::test]
async fn test_concurrent_starts_admit_exactly_one() {
    let app = TestApp::new();

    let attempts = (0..8).map(|_| {
        let service = app.service.clone();
        let req = start_request(&app);
        async move { service.start(req).await }
    });
    let results = futures::future::join_all(attempts).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind, ErrorKind::AlreadyImpersonating);
    }

    let live_tokens = app.issuer.minted().iter().filter(|m| !m.revoked).count();
    assert_eq!(live_tokens, 1);
    assert_eq!(app.sessions().await.len(), 1);
    assert_eq!(app.events_of(AuditEventType::Started).await.len(), 1);
}

#[tokio::test]
async fn test_stale_active_row_is_expired_before_new_start() {
    let app = TestApp::new();
    let stale = app.seed_stale().await;

    let started = app.service.start(start_request(&app)).await.unwrap();

    let old = app.service.get(&app.scope, stale.id).await.unwrap();
    assert!(!old.active);
    assert_eq!(old.end_reason.as_deref(), Some("timeout"));

    let new = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert!(new.active);

    let expired = app.events_of(AuditEventType::Expired).await;
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].impersonation_id, stale.id);
}

#[tokio::test]
async fn test_issuer_failure_leaves_no_record() {
    let app = TestApp::new();
    app.issuer.fail_create.store(true, Ordering::SeqCst);

    let err = app.service.start(start_request(&app)).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(app.sessions().await.is_empty());
    assert!(app.events().await.is_empty());
}

#[tokio::test]
async fn test_failed_persist_revokes_minted_session() {
    let app = TestApp::new();
    app.repo.fail_create.store(true, Ordering::SeqCst);

    let err = app.service.start(start_request(&app)).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Database);
    let minted = app.issuer.minted();
    assert_eq!(minted.len(), 1);
    assert!(minted[0].revoked);
    assert!(app.sessions().await.is_empty());
}

#[tokio::test]
async fn test_sink_failure_does_not_fail_start() {
    let app = TestApp::new();
    app.sink.fail.store(true, Ordering::SeqCst);

    assert!(app.service.start(start_request(&app)).await.is_ok());
    assert_eq!(app.events_of(AuditEventType::Started).await.len(), 1);
}

#[tokio::test]
async fn test_end_revokes_session_and_records_event() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();

    let ended = app
        .service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    assert!(ended.success);
    assert!(ended.session_revoked);
    assert!(app.issuer.is_revoked(&started.session_token));

    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert!(!session.active);
    assert_eq!(session.ended_at, Some(ended.ended_at));
    assert_eq!(session.end_reason.as_deref(), Some("manual"));

    let events = app.events_of(AuditEventType::Ended).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].details["session_revoked"], true);
}

#[tokio::test]
async fn test_end_twice_is_idempotent() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    let first = app
        .service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    let second = app
        .service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    assert!(second.success);
    assert!(!second.session_revoked);
    assert_eq!(second.ended_at, first.ended_at);
    assert_eq!(app.events_of(AuditEventType::Ended).await.len(), 1);
}

#[tokio::test]
async fn test_end_keeps_custom_reason() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();

    let mut req = end_request(&app, started.impersonation_id);
    req.reason = Some("Handed off to billing".to_string());
    app.service.end(req).await.unwrap();

    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert_eq!(session.end_reason.as_deref(), Some("Handed off to billing"));
}

#[tokio::test]
async fn test_end_by_another_actor_is_denied() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    let colleague = app.directory.add("colleague@support.test", &["support"]);

    let mut req = end_request(&app, started.impersonation_id);
    req.impersonator_id = colleague.id;
    let err = app.service.end(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert!(session.active);
}

#[tokio::test]
async fn test_foreign_tenant_sees_not_found() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    let foreign = TenantScope::app(AppId::new());

    let err = app
        .service
        .get(&foreign, started.impersonation_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImpersonationNotFound);

    let mut req = end_request(&app, started.impersonation_id);
    req.scope = foreign;
    let err = app.service.end(req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImpersonationNotFound);
}

#[tokio::test]
async fn test_revoke_failure_is_reported_not_raised() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    app.issuer.fail_revoke.store(true, Ordering::SeqCst);

    let ended = app
        .service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    assert!(!ended.session_revoked);
    let events = app.events_of(AuditEventType::Ended).await;
    assert_eq!(events[0].details["session_revoked"], false);
}

#[tokio::test]
async fn test_audit_failure_after_end_keeps_transition() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    app.repo.fail_audit.store(true, Ordering::SeqCst);

    let ended = app
        .service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    assert!(ended.success);
    let session = app.service.get(&app.scope, started.impersonation_id).await.unwrap();
    assert!(!session.active);
    assert!(app.events_of(AuditEventType::Ended).await.is_empty());
}

#[tokio::test]
async fn test_verify_reports_active_impersonation() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();

    let verified = app.service.verify(&started.session_id).await.unwrap();

    assert!(verified.is_impersonating);
    assert_eq!(verified.impersonation_id, Some(started.impersonation_id));
    assert_eq!(verified.impersonator_id, Some(app.agent.id));
    assert_eq!(verified.target_user_id, Some(app.customer.id));
    assert_eq!(
        verified.indicator_message.as_deref(),
        Some("You are impersonating another user")
    );
}

#[tokio::test]
async fn test_verify_without_match_is_not_an_error() {
    let app = TestApp::new();

    assert!(!app.service.verify("").await.unwrap().is_impersonating);
    assert!(!app.service.verify("unknown").await.unwrap().is_impersonating);

    let stale = app.seed_stale().await;
    let verified = app.service.verify(&stale.issued_session_id).await.unwrap();
    assert!(!verified.is_impersonating);
}

#[tokio::test]
async fn test_verify_after_end_is_not_impersonating() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();
    app.service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();

    let verified = app.service.verify(&started.session_id).await.unwrap();
    assert!(!verified.is_impersonating);
}

#[tokio::test]
async fn test_verify_omits_indicator_when_disabled() {
    let config = ImpersonationConfig {
        show_indicator: false,
        ..ImpersonationConfig::default()
    };
    let app = TestApp::with_config(config);
    let started = app.service.start(start_request(&app)).await.unwrap();

    let verified = app.service.verify(&started.session_id).await.unwrap();
    assert!(verified.is_impersonating);
    assert!(verified.indicator_message.is_none());
}

#[tokio::test]
async fn test_expire_sessions_closes_stale_rows_once() {
    let app = TestApp::new();
    let stale = app.seed_stale().await;

    assert_eq!(app.service.expire_sessions().await.unwrap(), 1);
    let after_first = app.service.get(&app.scope, stale.id).await.unwrap();
    assert!(!after_first.active);
    assert_eq!(after_first.end_reason.as_deref(), Some("timeout"));
    assert!(after_first.ended_at.is_some());

    assert_eq!(app.service.expire_sessions().await.unwrap(), 0);
    let after_second = app.service.get(&app.scope, stale.id).await.unwrap();
    assert_eq!(after_second.ended_at, after_first.ended_at);
    assert_eq!(app.events_of(AuditEventType::Expired).await.len(), 1);
}

#[tokio::test]
async fn test_expire_sessions_closes_every_stale_row_and_keeps_live_one() {
    let app = TestApp::new();
    for _ in 0..3 {
        app.seed_stale_for(UserId::new()).await;
    }
    let live = app.service.start(start_request(&app)).await.unwrap();

    assert_eq!(app.service.expire_sessions().await.unwrap(), 3);

    let active = app
        .service
        .list(ListRequest {
            scope: app.scope,
            filter: SessionFilter {
                active_only: true,
                ..SessionFilter::default()
            },
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    assert_eq!(active.total_items, 1);
    assert_eq!(active.items[0].id, live.impersonation_id);
    assert_eq!(app.events_of(AuditEventType::Expired).await.len(), 3);
}

#[tokio::test]
async fn test_expire_sessions_ignores_live_rows() {
    let app = TestApp::new();
    app.service.start(start_request(&app)).await.unwrap();

    assert_eq!(app.service.expire_sessions().await.unwrap(), 0);
    assert!(app.sessions().await[0].active);
}

#[tokio::test]
async fn test_expire_counts_transition_even_if_audit_fails() {
    let app = TestApp::new();
    let stale = app.seed_stale().await;
    app.repo.fail_audit.store(true, Ordering::SeqCst);

    assert_eq!(app.service.expire_sessions().await.unwrap(), 1);
    let session = app.service.get(&app.scope, stale.id).await.unwrap();
    assert!(!session.active);
}

#[tokio::test]
async fn test_list_is_scoped_and_filters_active() {
    let app = TestApp::new();
    let started = app.service.start(start_request(&app)).await.unwrap();

    let elsewhere = TenantScope::app(AppId::new());
    let req = StartRequest::new(elsewhere, app.agent.id, app.customer.id, REASON);
    app.service.start(req).await.unwrap();

    let page = app
        .service
        .list(ListRequest {
            scope: app.scope,
            filter: SessionFilter::default(),
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].id, started.impersonation_id);

    app.service
        .end(end_request(&app, started.impersonation_id))
        .await
        .unwrap();
    let active = app
        .service
        .list(ListRequest {
            scope: app.scope,
            filter: SessionFilter {
                active_only: true,
                ..SessionFilter::default()
            },
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    assert_eq!(active.total_items, 0);
    assert!(active.items.is_empty());
}
