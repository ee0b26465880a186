//! # Reconciler Integration Tests
//!
//! Drive the three reconcilers against the in-memory store and check the
//! resulting cluster state.

mod common;

use cnauth_controller::config::ControllerConfig;
use cnauth_controller::controller::token::verify_token;
use cnauth_controller::controller::{jwt_key, service, user, ReconcileOutcome};
use cnauth_controller::crd::{JwtKeyStatus, ResourceKind, UserStatus};
use cnauth_controller::error::{ReconcileError, StoreError};
use cnauth_controller::store::{ResourceKey, ResourceStore};
use common::{context, context_with, InMemoryStore};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_key_reconcile_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    let ctx = context(&store);
    let key = ResourceKey::new("default", "k1");

    let first = jwt_key::reconcile_by_key(&key, &ctx).await.expect("first run");
    assert_eq!(first, ReconcileOutcome::Updated);
    let after_first = store.jwt_key("default", "k1").expect("key exists");

    let second = jwt_key::reconcile_by_key(&key, &ctx).await.expect("second run");
    assert_eq!(second, ReconcileOutcome::Unchanged);
    let after_second = store.jwt_key("default", "k1").expect("key exists");

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.observed_key(), Some("s3cr3t"));
    assert_eq!(store.status_writes(), 1);
}

#[tokio::test]
async fn test_missing_resources_are_tolerated() {
    let store = Arc::new(InMemoryStore::new());
    let ctx = context(&store);
    let key = ResourceKey::new("default", "ghost");

    assert_eq!(
        jwt_key::reconcile_by_key(&key, &ctx).await.expect("jwt key"),
        ReconcileOutcome::Missing
    );
    assert_eq!(
        user::reconcile_by_key(&key, &ctx).await.expect("user"),
        ReconcileOutcome::Missing
    );
    assert_eq!(
        service::reconcile_by_key(&key, &ctx).await.expect("service"),
        ReconcileOutcome::Missing
    );
    assert_eq!(store.status_writes(), 0);
    assert_eq!(store.creates(), 0);
}

#[tokio::test]
async fn test_deleted_resources_request_no_retry() {
    let store = Arc::new(InMemoryStore::new());
    let ctx = Arc::new(context(&store));

    let action = jwt_key::reconcile(
        Arc::new(common::jwt_key("default", "gone", "s3cr3t")),
        Arc::clone(&ctx),
    )
    .await
    .expect("jwt key");
    assert_eq!(action, Action::await_change());

    let action = user::reconcile(
        Arc::new(common::user("default", "gone", "gone", "k1")),
        Arc::clone(&ctx),
    )
    .await
    .expect("user");
    assert_eq!(action, Action::await_change());

    let action = service::reconcile(Arc::new(common::service("ns1", "gone")), Arc::clone(&ctx))
        .await
        .expect("service");
    assert_eq!(action, Action::await_change());

    assert_eq!(store.status_writes(), 0);
    assert_eq!(store.creates(), 0);
}

#[tokio::test]
async fn test_user_token_is_signed_with_reconciled_key() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    store.insert_user(common::user("default", "alice", "alice", "k1"));
    let ctx = context(&store);

    jwt_key::reconcile_by_key(&ResourceKey::new("default", "k1"), &ctx)
        .await
        .expect("key reconcile");
    let outcome = user::reconcile_by_key(&ResourceKey::new("default", "alice"), &ctx)
        .await
        .expect("user reconcile");
    assert_eq!(outcome, ReconcileOutcome::Updated);

    let alice = store.user("default", "alice").expect("user exists");
    let claims = verify_token(alice.issued_token(), "s3cr3t").expect("token verifies");
    assert!(claims.authorized);
    assert_eq!(claims.username, "alice");
    assert!(verify_token(alice.issued_token(), "wrong").is_err());

    // Same claims and key: nothing to persist
    let again = user::reconcile_by_key(&ResourceKey::new("default", "alice"), &ctx)
        .await
        .expect("user reconcile");
    assert_eq!(again, ReconcileOutcome::Unchanged);
}

#[tokio::test]
async fn test_user_before_key_is_not_ready_then_converges() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    store.insert_user(common::user("default", "alice", "alice", "k1"));
    let ctx = context(&store);
    let alice = ResourceKey::new("default", "alice");

    let err = user::reconcile_by_key(&alice, &ctx)
        .await
        .expect_err("key has no status yet");
    assert!(matches!(err, ReconcileError::KeyNotReady { ref name, .. } if name == "k1"));
    assert_eq!(store.user("default", "alice").expect("user").issued_token(), "");

    jwt_key::reconcile_by_key(&ResourceKey::new("default", "k1"), &ctx)
        .await
        .expect("key reconcile");
    user::reconcile_by_key(&alice, &ctx).await.expect("retry succeeds");
    assert_ne!(store.user("default", "alice").expect("user").issued_token(), "");
}

#[tokio::test]
async fn test_missing_key_leaves_token_untouched() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_user(common::user("default", "alice", "alice", "missing"));
    let ctx = context(&store);
    let alice = ResourceKey::new("default", "alice");

    let err = user::reconcile_by_key(&alice, &ctx)
        .await
        .expect_err("key does not exist");
    match &err {
        ReconcileError::KeyRef { namespace, name, source } => {
            assert_eq!(namespace, "default");
            assert_eq!(name, "missing");
            assert!(source.is_not_found());
        }
        other => panic!("expected KeyRef, got {other:?}"),
    }
    assert_eq!(store.user("default", "alice").expect("user").issued_token(), "");
}

#[tokio::test]
async fn test_deleted_key_keeps_previous_token() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    store.insert_user(common::user("default", "alice", "alice", "k1"));
    let ctx = context(&store);
    let alice = ResourceKey::new("default", "alice");

    jwt_key::reconcile_by_key(&ResourceKey::new("default", "k1"), &ctx)
        .await
        .expect("key reconcile");
    user::reconcile_by_key(&alice, &ctx).await.expect("user reconcile");
    let issued = store.user("default", "alice").expect("user").issued_token().to_string();

    store.delete_jwt_key("default", "k1");
    let err = user::reconcile_by_key(&alice, &ctx)
        .await
        .expect_err("key was deleted");
    assert_eq!(err.reason(), "key_unresolved");
    assert_eq!(store.user("default", "alice").expect("user").issued_token(), issued);
}

#[tokio::test]
async fn test_key_ref_is_resolved_in_user_namespace() {
    let store = Arc::new(InMemoryStore::new());
    let mut other = common::jwt_key("other", "k1", "s3cr3t");
    other.status = Some(JwtKeyStatus {
        key: "s3cr3t".to_string(),
    });
    store.insert_jwt_key(other);
    store.insert_user(common::user("default", "alice", "alice", "k1"));
    let ctx = context(&store);

    let err = user::reconcile_by_key(&ResourceKey::new("default", "alice"), &ctx)
        .await
        .expect_err("key lives in another namespace");
    assert_eq!(err.reason(), "key_unresolved");
}

#[tokio::test]
async fn test_service_provisions_fixed_deployment() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_service(common::service("ns1", "svc1"));
    let ctx = context(&store);

    let outcome = service::reconcile_by_key(&ResourceKey::new("ns1", "svc1"), &ctx)
        .await
        .expect("service reconcile");
    assert_eq!(outcome, ReconcileOutcome::Created);

    let deployment = store.deployment("ns1", "svc1").expect("deployment created");
    let spec = deployment.spec.expect("deployment spec");
    assert_eq!(spec.replicas, Some(1));
    let labels = spec.selector.match_labels.expect("selector labels");
    assert_eq!(labels.get("app").map(String::as_str), Some("demo"));
    assert_eq!(labels.len(), 1);
    let pod = spec.template.spec.expect("pod spec");
    assert_eq!(pod.containers.len(), 1);
    assert_eq!(pod.containers[0].name, "web");
    assert_eq!(
        pod.containers[0].image.as_deref(),
        Some("lorenzodagostinorad/cnauthserver:0.0.1")
    );

    let owners = deployment.metadata.owner_references.expect("owner refs");
    assert_eq!(owners[0].uid, "uid-ns1-svc1");
}

#[tokio::test]
async fn test_service_reinvocation_converges() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_service(common::service("ns1", "svc1"));
    let ctx = context(&store);
    let key = ResourceKey::new("ns1", "svc1");

    service::reconcile_by_key(&key, &ctx).await.expect("first run");
    let second = service::reconcile_by_key(&key, &ctx).await.expect("second run");
    assert_eq!(second, ReconcileOutcome::Unchanged);
    assert_eq!(store.deployment_count(), 1);
    assert_eq!(store.creates(), 1);

    // A blind second create is still rejected by the store
    let existing = store.deployment("ns1", "svc1").expect("deployment");
    let err = store
        .create_deployment(&existing)
        .await
        .expect_err("duplicate create");
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_stale_status_write_conflicts() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_user(common::user("default", "alice", "alice", "k1"));

    let mut stale = store.user("default", "alice").expect("user");
    // A concurrent writer bumps the object first
    let mut fresh = stale.clone();
    fresh.status = Some(UserStatus {
        token: "first".to_string(),
    });
    store.update_user_status(&fresh).await.expect("fresh write");

    stale.status = Some(UserStatus {
        token: "second".to_string(),
    });
    let err = store
        .update_user_status(&stale)
        .await
        .expect_err("stale write");
    assert!(err.is_conflict());

    let conflict: ReconcileError = err.into();
    assert_eq!(conflict.reason(), "conflict");
    assert_eq!(
        store.user("default", "alice").expect("user").issued_token(),
        "first"
    );
}

#[tokio::test]
async fn test_rotated_key_reissues_token() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    store.insert_user(common::user("default", "alice", "alice", "k1"));
    let ctx = context(&store);
    let k1 = ResourceKey::new("default", "k1");
    let alice = ResourceKey::new("default", "alice");

    jwt_key::reconcile_by_key(&k1, &ctx).await.expect("key reconcile");
    user::reconcile_by_key(&alice, &ctx).await.expect("user reconcile");

    store.set_jwt_key_spec("default", "k1", "rotated");
    assert_eq!(
        jwt_key::reconcile_by_key(&k1, &ctx).await.expect("key reconcile"),
        ReconcileOutcome::Updated
    );
    assert_eq!(
        user::reconcile_by_key(&alice, &ctx).await.expect("user reconcile"),
        ReconcileOutcome::Updated
    );

    let token = store.user("default", "alice").expect("user").issued_token().to_string();
    assert!(verify_token(&token, "rotated").is_ok());
    assert!(verify_token(&token, "s3cr3t").is_err());
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_hits_deadline() {
    let store = Arc::new(InMemoryStore::with_latency(Duration::from_secs(5)));
    store.insert_jwt_key(common::jwt_key("default", "k1", "s3cr3t"));
    let config = ControllerConfig {
        reconcile_timeout_secs: 3,
        ..ControllerConfig::default()
    };
    let ctx = context_with(&store, config);

    let err = jwt_key::reconcile_by_key(&ResourceKey::new("default", "k1"), &ctx)
        .await
        .expect_err("store is slower than the deadline");
    match err {
        ReconcileError::DeadlineExceeded { kind, timeout } => {
            assert_eq!(kind, ResourceKind::JwtKey);
            assert_eq!(timeout, Duration::from_secs(3));
        }
        other => panic!("expected DeadlineExceeded, got {other:?}"),
    }
    assert_eq!(store.status_writes(), 0);
}
