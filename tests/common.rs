// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, fault-injecting stores, and recording collaborators
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `pierre_workout_engine`

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pierre_workout_engine::{
    auth::{AuthProvider, StaticAuthProvider},
    config::{DatabaseConfig, SessionConfig},
    database::{
        repositories::{
            ActiveSessionRepository, ProfileRepository, SessionStores, WeightLedgerRepository,
            WorkoutHistoryRepository,
        },
        Database,
    },
    errors::{AppResult, DatabaseError},
    models::{
        ActiveSession, ExerciseDefinition, NewActiveSession, SessionRecordSummary,
        WeightLedgerEntry, WorkoutHistoryRecord, WorkoutTemplate,
    },
    notifications::{Notification, NotificationKind, Notifier},
    recovery::ReconcileTarget,
    session::SessionController,
    utils::retry::RetryPolicy,
};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fresh migrated in-memory database
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::new(&DatabaseConfig::in_memory()).await?)
}

/// Session tuning with short budgets and near-instant retries
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        existing_session_check_timeout: Duration::from_millis(200),
        cancel_delete_timeout: Duration::from_millis(200),
        set_input_debounce: Duration::from_millis(40),
        write_retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)),
    }
}

/// Squat, bench and row, three sets each
pub fn leg_day_template() -> WorkoutTemplate {
    WorkoutTemplate::new(
        "leg-day",
        "Leg Day",
        vec![
            ExerciseDefinition::new("squat", "Back Squat", 3, "5"),
            ExerciseDefinition::new("bench", "Bench Press", 3, "8-10"),
            ExerciseDefinition::new("row", "Barbell Row", 3, "10"),
        ],
    )
}

/// Single-exercise template
pub fn deadlift_template() -> WorkoutTemplate {
    WorkoutTemplate::new(
        "pull-day",
        "Pull Day",
        vec![ExerciseDefinition::new("deadlift", "Deadlift", 2, "5")],
    )
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Keeps every notification for assertions
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn last(&self) -> Option<Notification> {
        self.received.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.received.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received.lock().unwrap().push(notification);
    }
}

/// Reconcile target that counts calls and can be told to fail
#[derive(Debug, Default)]
pub struct CountingTarget {
    pub reconciles: AtomicU32,
    pub discards: AtomicU32,
    pub failures_left: AtomicU32,
    pub delay_ms: AtomicU64,
}

#[async_trait]
impl ReconcileTarget for CountingTarget {
    async fn reconcile(&self) -> AppResult<Option<ActiveSession>> {
        self.reconciles.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if take_one(&self.failures_left) {
            return Err(injected("reconcile").into());
        }
        Ok(None)
    }

    async fn discard_local(&self) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fault injection
// ============================================================================

/// Switches shared by the fault-injecting store wrappers
#[derive(Debug, Default)]
pub struct Faults {
    pub fail_inserts: AtomicU32,
    pub fail_updates: AtomicBool,
    pub fail_get_active: AtomicBool,
    pub get_active_delay_ms: AtomicU64,
    pub fail_deletes: AtomicBool,
    pub delete_delay_ms: AtomicU64,
    pub fail_history_appends: AtomicU32,
    pub fail_xp_increments: AtomicU32,
    pub fail_ledger_writes: AtomicBool,

    pub inserts: AtomicU32,
    pub deletes: AtomicU32,
    pub history_appends: AtomicU32,
    pub xp_increments: AtomicU32,
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(operation: &str) -> DatabaseError {
    DatabaseError::QueryError {
        context: format!("injected fault: {operation}"),
    }
}

async fn delay(ms: &AtomicU64) {
    let ms = ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

pub struct FaultySessions {
    inner: Arc<dyn ActiveSessionRepository>,
    faults: Arc<Faults>,
}

#[async_trait]
impl ActiveSessionRepository for FaultySessions {
    async fn get_active(&self, user_id: Uuid) -> Result<Option<ActiveSession>, DatabaseError> {
        delay(&self.faults.get_active_delay_ms).await;
        if self.faults.fail_get_active.load(Ordering::SeqCst) {
            return Err(injected("get_active"));
        }
        self.inner.get_active(user_id).await
    }

    async fn insert(
        &self,
        user_id: Uuid,
        session: &NewActiveSession,
    ) -> Result<Uuid, DatabaseError> {
        self.faults.inserts.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.faults.fail_inserts) {
            return Err(injected("insert"));
        }
        self.inner.insert(user_id, session).await
    }

    async fn update(&self, session: &ActiveSession) -> Result<(), DatabaseError> {
        if self.faults.fail_updates.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }
        self.inner.update(session).await
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        self.faults.deletes.fetch_add(1, Ordering::SeqCst);
        delay(&self.faults.delete_delay_ms).await;
        if self.faults.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.inner.delete(session_id).await
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SessionRecordSummary>, DatabaseError> {
        self.inner.list_by_user(user_id).await
    }

    async fn delete_incomplete_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.inner.delete_incomplete_for_user(user_id).await
    }

    async fn mark_completed(&self, session_id: Uuid) -> Result<(), DatabaseError> {
        self.inner.mark_completed(session_id).await
    }

    async fn purge_completed(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.inner.purge_completed(user_id).await
    }
}

pub struct FaultyHistory {
    inner: Arc<dyn WorkoutHistoryRepository>,
    faults: Arc<Faults>,
}

#[async_trait]
impl WorkoutHistoryRepository for FaultyHistory {
    async fn append(&self, record: &WorkoutHistoryRecord) -> Result<Uuid, DatabaseError> {
        self.faults.history_appends.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.faults.fail_history_appends) {
            return Err(injected("history append"));
        }
        self.inner.append(record).await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WorkoutHistoryRecord>, DatabaseError> {
        self.inner.list_for_user(user_id).await
    }
}

pub struct FaultyProfiles {
    inner: Arc<dyn ProfileRepository>,
    faults: Arc<Faults>,
}

#[async_trait]
impl ProfileRepository for FaultyProfiles {
    async fn current_xp(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.inner.current_xp(user_id).await
    }

    async fn increment_xp(&self, user_id: Uuid, delta: u32) -> Result<u64, DatabaseError> {
        self.faults.xp_increments.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.faults.fail_xp_increments) {
            return Err(injected("xp increment"));
        }
        self.inner.increment_xp(user_id, delta).await
    }
}

pub struct FaultyWeights {
    inner: Arc<dyn WeightLedgerRepository>,
    faults: Arc<Faults>,
}

#[async_trait]
impl WeightLedgerRepository for FaultyWeights {
    async fn latest_weight(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Option<f64>, DatabaseError> {
        self.inner.latest_weight(user_id, exercise_id).await
    }

    async fn record_latest(
        &self,
        user_id: Uuid,
        exercise_id: &str,
        weight: f64,
    ) -> Result<WeightLedgerEntry, DatabaseError> {
        if self.faults.fail_ledger_writes.load(Ordering::SeqCst) {
            return Err(injected("ledger write"));
        }
        self.inner.record_latest(user_id, exercise_id, weight).await
    }

    async fn history(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        self.inner.history(user_id, exercise_id).await
    }

    async fn latest_entries(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        self.inner.latest_entries(user_id, exercise_id).await
    }
}

/// Wrap every store of `stores` with the given fault switches
pub fn faulty_stores(stores: &SessionStores, faults: &Arc<Faults>) -> SessionStores {
    SessionStores {
        sessions: Arc::new(FaultySessions {
            inner: Arc::clone(&stores.sessions),
            faults: Arc::clone(faults),
        }),
        weights: Arc::new(FaultyWeights {
            inner: Arc::clone(&stores.weights),
            faults: Arc::clone(faults),
        }),
        history: Arc::new(FaultyHistory {
            inner: Arc::clone(&stores.history),
            faults: Arc::clone(faults),
        }),
        profiles: Arc::new(FaultyProfiles {
            inner: Arc::clone(&stores.profiles),
            faults: Arc::clone(faults),
        }),
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A controller over a real in-memory database with fault switches in between
pub struct TestHarness {
    pub database: Database,
    pub stores: SessionStores,
    pub faults: Arc<Faults>,
    pub auth: Arc<StaticAuthProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: Arc<SessionController>,
    pub user_id: Uuid,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let database = create_test_database().await?;
        Ok(Self::over(database, Uuid::new_v4()))
    }

    /// Another client of the same user sharing `database`
    pub fn over(database: Database, user_id: Uuid) -> Self {
        let stores = SessionStores::sqlite(&database);
        let faults = Arc::new(Faults::default());
        let auth = Arc::new(StaticAuthProvider::signed_in(user_id));
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = Arc::new(SessionController::new(
            faulty_stores(&stores, &faults),
            Arc::clone(&auth) as Arc<dyn AuthProvider>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            fast_session_config(),
        ));
        Self {
            database,
            stores,
            faults,
            auth,
            notifier,
            controller,
            user_id,
        }
    }
}
