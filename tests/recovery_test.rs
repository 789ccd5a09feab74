// ABOUTME: Integration tests for orphan cleanup, reloads, and the recovery layer
// ABOUTME: Covers the two-client race, malformed documents, coalesced passes, and environment signals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{
    create_test_database, deadlift_template, leg_day_template, CountingTarget, RecordingNotifier,
    TestHarness,
};
use pierre_workout_engine::{
    auth::{AuthProvider, StaticAuthProvider},
    config::RecoveryConfig,
    models::NewActiveSession,
    notifications::{NotificationKind, Notifier},
    recovery::{
        ConnectivityMonitor, ConnectivityProbe, ConnectivityStatus, EnvironmentSignal,
        InMemorySnapshotCache, LifecycleSnapshot, PassKind, PassOutcome, ReconcileTarget,
        ReconciliationCoordinator, RecoveryEvent, RecoveryLayer, SnapshotCache,
    },
    utils::retry::RetryPolicy,
};
use uuid::Uuid;

fn fast_recovery_config() -> RecoveryConfig {
    RecoveryConfig {
        reconcile_debounce: Duration::from_millis(40),
        heartbeat_timeout: Duration::from_millis(200),
        retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)),
        ..RecoveryConfig::default()
    }
}

// ============================================================================
// Orphan cleanup and reload
// ============================================================================

#[tokio::test]
async fn test_reload_keeps_only_newest_orphan() {
    let harness = TestHarness::new().await.unwrap();
    let draft = NewActiveSession::from_template(&leg_day_template(), &HashMap::new(), Utc::now());
    let sessions = &harness.stores.sessions;
    let oldest = sessions.insert(harness.user_id, &draft).await.unwrap();
    let middle = sessions.insert(harness.user_id, &draft).await.unwrap();
    let newest = sessions.insert(harness.user_id, &draft).await.unwrap();

    let loaded = harness.controller.reload().await.unwrap().unwrap();

    assert_eq!(loaded.id, newest);
    let remaining = sessions.list_by_user(harness.user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|s| s.id != oldest && s.id != middle));
    assert_eq!(harness.controller.current_session().await.unwrap().id, newest);
}

#[tokio::test]
async fn test_concurrent_starts_converge_to_one_session() {
    let database = create_test_database().await.unwrap();
    let user_id = Uuid::new_v4();
    let phone = TestHarness::over(database.clone(), user_id);
    let tablet = TestHarness::over(database, user_id);
    // Both existence checks time out, so neither client sees the other
    phone.faults.get_active_delay_ms.store(300, Ordering::SeqCst);
    tablet.faults.get_active_delay_ms.store(300, Ordering::SeqCst);

    let leg_day = leg_day_template();
    let deadlift = deadlift_template();
    let (a, b) = tokio::join!(
        phone.controller.start(&leg_day),
        tablet.controller.start(&deadlift),
    );
    assert!(a.is_ok() || b.is_ok());

    phone.faults.get_active_delay_ms.store(0, Ordering::SeqCst);
    phone.controller.cleanup_orphans().await.unwrap();

    let remaining = phone.stores.sessions.list_by_user(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    let survivor = phone.controller.reload().await.unwrap().unwrap();
    assert_eq!(survivor.id, remaining[0].id);
}

#[tokio::test]
async fn test_cleanup_purges_completed_rows() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.start(&leg_day_template()).await.unwrap();
    harness.controller.complete().await.unwrap();

    let removed = harness.controller.cleanup_orphans().await.unwrap();

    assert_eq!(removed, 0);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM active_workouts WHERE user_id = ?1")
        .bind(harness.user_id.to_string())
        .fetch_one(harness.database.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_reload_treats_malformed_document_as_no_session() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.controller.start(&leg_day_template()).await.unwrap();
    sqlx::query("UPDATE active_workouts SET progress = '{\"broken\": true' WHERE id = ?1")
        .bind(session.id.to_string())
        .execute(harness.database.pool())
        .await
        .unwrap();

    let loaded = harness.controller.reload().await.unwrap();

    assert!(loaded.is_none());
    assert!(!harness.controller.has_active_session().await);
}

#[tokio::test]
async fn test_failed_reload_clears_local_state() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.start(&leg_day_template()).await.unwrap();
    harness.faults.fail_get_active.store(true, Ordering::SeqCst);

    let err = harness.controller.reload().await.unwrap_err();

    assert!(err.is_retryable());
    assert!(!harness.controller.has_active_session().await);
    assert!(harness.controller.load_active_session().await.is_none());
}

#[tokio::test]
async fn test_reload_without_user_is_empty() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.start(&leg_day_template()).await.unwrap();
    harness.auth.sign_out();

    assert!(harness.controller.reload().await.unwrap().is_none());
    assert!(!harness.controller.has_active_session().await);
    assert_eq!(harness.controller.cleanup_orphans().await.unwrap(), 0);
}

#[tokio::test]
async fn test_load_resumes_session_on_fresh_client() {
    let harness = TestHarness::new().await.unwrap();
    let started = harness.controller.start(&leg_day_template()).await.unwrap();
    harness.controller.set_reps("squat", 1, 5).await.unwrap();

    let restarted = TestHarness::over(harness.database.clone(), harness.user_id);
    let resumed = restarted.controller.load_active_session().await.unwrap();

    assert_eq!(resumed.id, started.id);
    assert_eq!(resumed.progress_for("squat").unwrap().sets[1].reps, 5);
}

// ============================================================================
// Reconciliation coordinator
// ============================================================================

fn counting_coordinator(
    target: &Arc<CountingTarget>,
    auth: &Arc<StaticAuthProvider>,
) -> ReconciliationCoordinator {
    ReconciliationCoordinator::new(
        Arc::clone(target) as Arc<dyn ReconcileTarget>,
        Arc::clone(auth) as Arc<dyn AuthProvider>,
        &fast_recovery_config(),
    )
}

#[tokio::test]
async fn test_duplicate_triggers_produce_one_reload() {
    let target = Arc::new(CountingTarget::default());
    let auth = Arc::new(StaticAuthProvider::signed_in(Uuid::new_v4()));
    let coordinator = counting_coordinator(&target, &auth);

    coordinator.request(PassKind::Routine).await;
    coordinator.request(PassKind::Routine).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(target.reconciles.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.completed_passes(), 1);
}

#[tokio::test]
async fn test_pass_in_flight_drops_overlapping_pass() {
    let target = Arc::new(CountingTarget::default());
    target.delay_ms.store(100, Ordering::SeqCst);
    let auth = Arc::new(StaticAuthProvider::signed_in(Uuid::new_v4()));
    let coordinator = counting_coordinator(&target, &auth);

    let (first, second) = tokio::join!(
        coordinator.reconcile_now(PassKind::Routine),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            coordinator.reconcile_now(PassKind::Routine).await
        }
    );

    assert_eq!(first, Some(PassOutcome::Reconciled { session_id: None }));
    assert_eq!(second, None);
    assert_eq!(target.reconciles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recovery_pass_reloads_controller_from_store() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.controller.start(&leg_day_template()).await.unwrap();
    let coordinator = ReconciliationCoordinator::new(
        Arc::clone(&harness.controller) as Arc<dyn ReconcileTarget>,
        Arc::clone(&harness.auth) as Arc<dyn AuthProvider>,
        &fast_recovery_config(),
    );

    // Another client edits the stored copy while this one is in the background
    let other = TestHarness::over(harness.database.clone(), harness.user_id);
    other.controller.load_active_session().await.unwrap();
    other.controller.add_set("bench").await.unwrap();

    let outcome = coordinator.reconcile_now(PassKind::Recovery).await;

    assert_eq!(
        outcome,
        Some(PassOutcome::Reconciled {
            session_id: Some(session.id)
        })
    );
    assert_eq!(harness.auth.refresh_count(), 1);
    let current = harness.controller.current_session().await.unwrap();
    assert_eq!(current.progress_for("bench").unwrap().sets.len(), 4);
}

#[tokio::test]
async fn test_expired_auth_clears_controller_session() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.start(&leg_day_template()).await.unwrap();
    harness.auth.expire();
    let coordinator = ReconciliationCoordinator::new(
        Arc::clone(&harness.controller) as Arc<dyn ReconcileTarget>,
        Arc::clone(&harness.auth) as Arc<dyn AuthProvider>,
        &fast_recovery_config(),
    );

    let outcome = coordinator.reconcile_now(PassKind::Recovery).await;

    assert_eq!(outcome, Some(PassOutcome::AuthExpired));
    assert!(!harness.controller.has_active_session().await);
    // The stored session survives for after re-authentication
    assert!(harness
        .stores
        .sessions
        .get_active(harness.user_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_exhausted_retries_give_up_silently() {
    let target = Arc::new(CountingTarget::default());
    target.failures_left.store(5, Ordering::SeqCst);
    let auth = Arc::new(StaticAuthProvider::signed_in(Uuid::new_v4()));
    let coordinator = counting_coordinator(&target, &auth);
    let mut events = coordinator.subscribe();

    let outcome = coordinator.reconcile_now(PassKind::Routine).await;

    assert!(matches!(outcome, Some(PassOutcome::GaveUp { .. })));
    assert_eq!(target.reconciles.load(Ordering::SeqCst), 3);
    assert_eq!(
        events.recv().await.unwrap(),
        RecoveryEvent::GaveUp {
            kind: PassKind::Routine,
            attempts: 3
        }
    );

    // The next trigger starts over
    let outcome = coordinator.reconcile_now(PassKind::Routine).await;
    assert_eq!(outcome, Some(PassOutcome::Reconciled { session_id: None }));
}

// ============================================================================
// Environment signals
// ============================================================================

struct LayerFixture {
    layer: RecoveryLayer,
    target: Arc<CountingTarget>,
    auth: Arc<StaticAuthProvider>,
    notifier: Arc<RecordingNotifier>,
    snapshots: Arc<InMemorySnapshotCache>,
}

async fn layer_fixture() -> LayerFixture {
    let database = create_test_database().await.unwrap();
    let target = Arc::new(CountingTarget::default());
    let auth = Arc::new(StaticAuthProvider::signed_in(Uuid::new_v4()));
    let notifier = Arc::new(RecordingNotifier::default());
    let snapshots = Arc::new(InMemorySnapshotCache::new());
    let config = fast_recovery_config();
    let coordinator = counting_coordinator(&target, &auth);
    let connectivity = Arc::new(
        ConnectivityMonitor::new(
            Arc::new(database) as Arc<dyn ConnectivityProbe>,
            config.heartbeat_timeout,
        )
        .with_coordinator(coordinator.clone()),
    );
    let layer = RecoveryLayer::new(
        config,
        Arc::clone(&snapshots) as Arc<dyn SnapshotCache>,
        coordinator,
        connectivity,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );
    LayerFixture {
        layer,
        target,
        auth,
        notifier,
        snapshots,
    }
}

#[tokio::test]
async fn test_quick_return_to_same_screen_is_routine() {
    let fixture = layer_fixture().await;

    let none = fixture
        .layer
        .handle(EnvironmentSignal::WentBackground {
            location: "/workout".to_owned(),
            scroll_offset: 120.0,
        })
        .await;
    assert!(none.is_none());
    assert!(fixture.snapshots.peek().await.is_some());

    let kind = fixture
        .layer
        .handle(EnvironmentSignal::CameForeground {
            location: "/workout".to_owned(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(kind, Some(PassKind::Routine));
    assert_eq!(fixture.target.reconciles.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.auth.refresh_count(), 0);
    assert!(fixture.snapshots.peek().await.is_none());
    assert_eq!(
        fixture.layer.connectivity().status(),
        ConnectivityStatus::Online
    );
}

#[tokio::test]
async fn test_return_to_other_screen_refreshes_auth() {
    let fixture = layer_fixture().await;
    fixture
        .layer
        .handle(EnvironmentSignal::WentBackground {
            location: "/workout".to_owned(),
            scroll_offset: 0.0,
        })
        .await;

    let kind = fixture
        .layer
        .handle(EnvironmentSignal::CameForeground {
            location: "/history".to_owned(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(kind, Some(PassKind::Recovery));
    assert_eq!(fixture.auth.refresh_count(), 1);
    assert_eq!(fixture.target.reconciles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_long_absence_notifies_user() {
    let fixture = layer_fixture().await;
    let mut events = fixture.layer.coordinator().subscribe();
    let mut snapshot = LifecycleSnapshot::now("/workout", 0.0);
    snapshot.taken_at = Utc::now() - chrono::Duration::minutes(15);
    fixture.snapshots.save(snapshot).await;

    let kind = fixture
        .layer
        .handle(EnvironmentSignal::CameForeground {
            location: "/workout".to_owned(),
        })
        .await;

    assert_eq!(kind, Some(PassKind::Recovery));
    assert_eq!(fixture.notifier.count(NotificationKind::Info), 1);
    assert!(matches!(
        events.recv().await.unwrap(),
        RecoveryEvent::LongAbsence { away } if away >= Duration::from_secs(14 * 60)
    ));
}

#[tokio::test]
async fn test_connectivity_restore_triggers_pass() {
    let fixture = layer_fixture().await;

    fixture.layer.handle(EnvironmentSignal::LostConnectivity).await;
    assert_eq!(
        fixture.layer.connectivity().status(),
        ConnectivityStatus::Offline
    );
    assert_eq!(fixture.target.reconciles.load(Ordering::SeqCst), 0);

    let kind = fixture
        .layer
        .handle(EnvironmentSignal::RestoredConnectivity)
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(kind, Some(PassKind::Routine));
    assert_eq!(
        fixture.layer.connectivity().status(),
        ConnectivityStatus::Online
    );
    // The monitor's own request and the signal's request coalesce
    assert_eq!(fixture.target.reconciles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_heartbeat_detects_closed_database() {
    let database = create_test_database().await.unwrap();
    let monitor = ConnectivityMonitor::new(
        Arc::new(database.clone()) as Arc<dyn ConnectivityProbe>,
        Duration::from_millis(200),
    );
    let mut status = monitor.subscribe();

    assert_eq!(monitor.check_now().await, ConnectivityStatus::Online);
    database.close().await;
    assert_eq!(monitor.check_now().await, ConnectivityStatus::Offline);

    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), ConnectivityStatus::Offline);
}

#[tokio::test]
async fn test_heartbeat_task_stops_on_shutdown() {
    let fixture = layer_fixture().await;
    let handle = fixture.layer.start_heartbeat();
    // The first tick fires immediately
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        fixture.layer.connectivity().status(),
        ConnectivityStatus::Online
    );
    handle.shutdown().await;
}
