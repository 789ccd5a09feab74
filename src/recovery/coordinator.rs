// ABOUTME: Reconciliation coordinator: debounced, single-flight reloads of session truth
// ABOUTME: Recovery passes re-verify auth first; retries are bounded and failures stay silent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Reconciliation passes.
//!
//! A pass never merges deltas: it asks the [`ReconcileTarget`] to re-derive
//! its state from the store. Running one twice is harmless, so the coordinator
//! only has to bound waste:
//!
//! - requests inside the debounce window collapse into one pass, and a
//!   recovery request upgrades a pending routine one;
//! - a routine request that arrives while a pass is in flight is dropped, the
//!   running pass already reads the latest truth;
//! - a recovery request that arrives during a routine pass is queued and runs
//!   right after it, so the credential is still re-verified.
//!
//! Exhausted retries emit [`RecoveryEvent::GaveUp`] and wait for the next trigger.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthProvider;
use crate::config::RecoveryConfig;
use crate::constants::recovery::EVENT_CHANNEL_CAPACITY;
use crate::errors::{AppResult, ErrorCode};
use crate::logging::SessionLogger;
use crate::models::ActiveSession;
use crate::utils::retry::RetryPolicy;

/// Something whose state can be re-derived from the store
#[async_trait]
pub trait ReconcileTarget: Send + Sync {
    /// Reload from the store, replacing local state
    async fn reconcile(&self) -> AppResult<Option<ActiveSession>>;

    /// Drop local state without touching the store
    async fn discard_local(&self);
}

/// Flavor of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    /// Plain reload
    Routine,
    /// Reload preceded by a credential refresh
    Recovery,
}

impl PassKind {
    /// Label used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Recovery => "recovery",
        }
    }
}

/// Outcome of a pass that actually ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// State reloaded
    Reconciled {
        /// Active session found, if any
        session_id: Option<Uuid>,
    },
    /// Credential refresh was rejected; local state was discarded
    AuthExpired,
    /// Every attempt failed
    GaveUp {
        /// Code of the last error
        code: ErrorCode,
    },
}

/// Events for consumers that want to react to recovery (UI prompts, metrics)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryEvent {
    /// A pass reloaded state
    Reconciled {
        /// Pass flavor
        kind: PassKind,
        /// Active session found, if any
        session_id: Option<Uuid>,
    },
    /// Re-authentication is needed
    AuthExpired,
    /// A pass exhausted its retries
    GaveUp {
        /// Pass flavor
        kind: PassKind,
        /// Attempts made
        attempts: u32,
    },
    /// The app returned after the long-absence threshold
    LongAbsence {
        /// Time spent in the background
        away: Duration,
    },
    /// The connectivity heartbeat changed state
    ConnectivityChanged {
        /// Store reachable
        online: bool,
    },
}

#[derive(Debug, Default)]
struct FlightState {
    running: Option<PassKind>,
    trailing: Option<PassKind>,
}

/// Resets flight state if a pass is abandoned mid-way
struct FlightGuard<'a> {
    inner: &'a CoordinatorInner,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.inner.lock_flight() = FlightState::default();
            self.inner.in_flight.store(false, Ordering::Release);
        }
    }
}

struct CoordinatorInner {
    target: Arc<dyn ReconcileTarget>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryPolicy,
    debounce: Duration,
    generation: AtomicU64,
    pending: Mutex<Option<PassKind>>,
    flight: StdMutex<FlightState>,
    in_flight: AtomicBool,
    completed_passes: AtomicU64,
    events: broadcast::Sender<RecoveryEvent>,
}

impl CoordinatorInner {
    fn lock_flight(&self) -> std::sync::MutexGuard<'_, FlightState> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounced, single-flight driver of reconciliation passes
#[derive(Clone)]
pub struct ReconciliationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ReconciliationCoordinator {
    /// Coordinator using the recovery configuration's debounce and retry policy
    #[must_use]
    pub fn new(
        target: Arc<dyn ReconcileTarget>,
        auth: Arc<dyn AuthProvider>,
        config: &RecoveryConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                target,
                auth,
                retry: config.retry,
                debounce: config.reconcile_debounce,
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                flight: StdMutex::new(FlightState::default()),
                in_flight: AtomicBool::new(false),
                completed_passes: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Receive recovery events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.inner.events.subscribe()
    }

    /// Passes that reached the store successfully
    #[must_use]
    pub fn completed_passes(&self) -> u64 {
        self.inner.completed_passes.load(Ordering::Acquire)
    }

    /// Whether a pass is running right now
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn emit(&self, event: RecoveryEvent) {
        // No subscribers is normal for headless use
        let _ = self.inner.events.send(event);
    }

    /// Ask for a pass after the debounce window
    pub async fn request(&self, kind: PassKind) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        {
            let mut pending = self.inner.pending.lock().await;
            *pending = Some(pending.map_or(kind, |queued| queued.max(kind)));
        }
        debug!(kind = kind.as_str(), generation, "Reconciliation requested");

        let coordinator = self.clone();
        tokio::spawn(async move {
            sleep(coordinator.inner.debounce).await;
            if coordinator.inner.generation.load(Ordering::Acquire) != generation {
                return;
            }
            let Some(kind) = coordinator.inner.pending.lock().await.take() else {
                return;
            };
            coordinator.run_pass(kind).await;
        });
    }

    /// Run a pass immediately, bypassing the debounce window
    ///
    /// Returns `None` if another pass is already in flight. A recovery request
    /// made during a routine pass is queued behind it; the caller of the routine
    /// pass then receives the outcome of the queued one.
    pub async fn reconcile_now(&self, kind: PassKind) -> Option<PassOutcome> {
        self.run_pass(kind).await
    }

    /// Claim the flight slot, or queue/drop the request if a pass is running
    fn claim(&self, kind: PassKind) -> bool {
        let inner = &self.inner;
        let mut flight = inner.lock_flight();
        match flight.running {
            Some(PassKind::Routine) if kind == PassKind::Recovery => {
                debug!("Recovery requested during a routine pass, queued to follow it");
                flight.trailing = Some(kind);
                false
            }
            Some(running) => {
                debug!(
                    kind = kind.as_str(),
                    running = running.as_str(),
                    "Pass already in flight, dropping request"
                );
                false
            }
            None => {
                flight.running = Some(kind);
                inner.in_flight.store(true, Ordering::Release);
                true
            }
        }
    }

    async fn run_pass(&self, kind: PassKind) -> Option<PassOutcome> {
        if !self.claim(kind) {
            return None;
        }
        let inner = &self.inner;
        let mut guard = FlightGuard { inner, armed: true };
        let mut kind = kind;

        loop {
            let outcome = self.execute(kind).await;
            match self.next_queued() {
                Some(next) => kind = next,
                None => {
                    guard.armed = false;
                    return Some(outcome);
                }
            }
        }
    }

    /// Hand the flight slot to a queued pass, or release it
    fn next_queued(&self) -> Option<PassKind> {
        let inner = &self.inner;
        let mut flight = inner.lock_flight();
        if let Some(next) = flight.trailing.take() {
            flight.running = Some(next);
            return Some(next);
        }
        *flight = FlightState::default();
        inner.in_flight.store(false, Ordering::Release);
        None
    }

    async fn execute(&self, kind: PassKind) -> PassOutcome {
        let inner = &self.inner;
        let started = Instant::now();

        if kind == PassKind::Recovery {
            if let Err(e) = inner.auth.refresh().await {
                if matches!(e.code, ErrorCode::AuthExpired | ErrorCode::AuthRequired) {
                    warn!(error = %e, "Credential expired during recovery, discarding local session");
                    inner.target.discard_local().await;
                    self.emit(RecoveryEvent::AuthExpired);
                    return PassOutcome::AuthExpired;
                }
                warn!(error = %e, "Credential refresh failed, reconciling with current credential");
            }
        }

        let target = &inner.target;
        let result = inner
            .retry
            .run("reconcile", move || async move { target.reconcile().await })
            .await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(session) => {
                let session_id = session.map(|s| s.id);
                inner.completed_passes.fetch_add(1, Ordering::AcqRel);
                SessionLogger::log_reconcile_pass(kind.as_str(), session_id.is_some(), duration_ms);
                self.emit(RecoveryEvent::Reconciled { kind, session_id });
                PassOutcome::Reconciled { session_id }
            }
            Err(e) => {
                warn!(
                    kind = kind.as_str(),
                    error = %e,
                    duration_ms,
                    "Reconciliation gave up, waiting for next trigger"
                );
                self.emit(RecoveryEvent::GaveUp {
                    kind,
                    attempts: inner.retry.max_attempts.max(1),
                });
                PassOutcome::GaveUp { code: e.code }
            }
        }
    }
}
