// ABOUTME: Environment-signal handling: background/foreground and connectivity transitions
// ABOUTME: Turns signals into snapshots, staleness assessments and reconciliation requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! The recovery layer reacts to the host environment.
//!
//! Going to the background stores a [`LifecycleSnapshot`]. Coming back compares
//! it with the current location and the time spent away: a long or disorienting
//! absence gets a recovery pass (auth refresh plus reload), anything else a
//! routine reload. Losing connectivity only updates the monitor; regaining it
//! asks for a routine pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::connectivity::{ConnectivityMonitor, HeartbeatHandle};
use super::coordinator::{PassKind, ReconciliationCoordinator, RecoveryEvent};
use super::snapshot::{LifecycleSnapshot, SnapshotCache};
use crate::config::RecoveryConfig;
use crate::notifications::{Notification, Notifier};

/// Signals delivered by the host environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvironmentSignal {
    /// The app was hidden
    WentBackground {
        /// Screen the user was on
        location: String,
        /// Scroll position on that screen
        scroll_offset: f64,
    },
    /// The app became visible again
    CameForeground {
        /// Screen the app reopened on
        location: String,
    },
    /// Network reported down
    LostConnectivity,
    /// Network reported up
    RestoredConnectivity,
}

/// How a return to the foreground should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundAssessment {
    /// Pass to request
    pub kind: PassKind,
    /// Time spent in the background, if a snapshot existed
    pub away: Option<Duration>,
    /// Whether the user should be told they were away a long time
    pub long_absence: bool,
}

/// Classify a return to the foreground
#[must_use]
pub fn assess_foreground(
    snapshot: Option<&LifecycleSnapshot>,
    current_location: &str,
    away: Option<Duration>,
    config: &RecoveryConfig,
) -> ForegroundAssessment {
    let Some(snapshot) = snapshot else {
        return ForegroundAssessment {
            kind: PassKind::Routine,
            away: None,
            long_absence: false,
        };
    };
    let away = away.unwrap_or(Duration::ZERO);
    let stale = away > config.stale_snapshot_threshold;
    let moved = snapshot.location != current_location;
    ForegroundAssessment {
        kind: if stale || moved {
            PassKind::Recovery
        } else {
            PassKind::Routine
        },
        away: Some(away),
        long_absence: away > config.long_absence_threshold,
    }
}

/// Glue between environment signals and the reconciliation machinery
pub struct RecoveryLayer {
    config: RecoveryConfig,
    snapshots: Arc<dyn SnapshotCache>,
    coordinator: ReconciliationCoordinator,
    connectivity: Arc<ConnectivityMonitor>,
    notifier: Arc<dyn Notifier>,
}

impl RecoveryLayer {
    /// Assemble the layer
    #[must_use]
    pub fn new(
        config: RecoveryConfig,
        snapshots: Arc<dyn SnapshotCache>,
        coordinator: ReconciliationCoordinator,
        connectivity: Arc<ConnectivityMonitor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            snapshots,
            coordinator,
            connectivity,
            notifier,
        }
    }

    /// Coordinator driving the passes
    #[must_use]
    pub const fn coordinator(&self) -> &ReconciliationCoordinator {
        &self.coordinator
    }

    /// Connectivity monitor
    #[must_use]
    pub const fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// React to one signal; returns the pass requested, if any
    pub async fn handle(&self, signal: EnvironmentSignal) -> Option<PassKind> {
        match signal {
            EnvironmentSignal::WentBackground {
                location,
                scroll_offset,
            } => {
                debug!(location = %location, "App went to background, saving snapshot");
                self.snapshots
                    .save(LifecycleSnapshot::now(location, scroll_offset))
                    .await;
                None
            }
            EnvironmentSignal::CameForeground { location } => {
                Some(self.on_foreground(&location).await)
            }
            EnvironmentSignal::LostConnectivity => {
                self.connectivity.report(false).await;
                None
            }
            EnvironmentSignal::RestoredConnectivity => {
                self.connectivity.report(true).await;
                self.coordinator.request(PassKind::Routine).await;
                Some(PassKind::Routine)
            }
        }
    }

    async fn on_foreground(&self, location: &str) -> PassKind {
        let snapshot = self.snapshots.take().await;
        let away = snapshot.as_ref().map(|s| s.age(Utc::now()));
        let assessment = assess_foreground(snapshot.as_ref(), location, away, &self.config);

        if assessment.long_absence {
            let away = assessment.away.unwrap_or(Duration::ZERO);
            info!(away_secs = away.as_secs(), "Returned after a long absence");
            self.notifier.notify(Notification::info(
                "Welcome back",
                format!(
                    "You were away for {} minutes; your workout has been refreshed",
                    away.as_secs() / 60
                ),
            ));
            self.coordinator.emit(RecoveryEvent::LongAbsence { away });
        }

        debug!(
            kind = assessment.kind.as_str(),
            location,
            "App came to foreground, requesting reconciliation"
        );
        self.coordinator.request(assessment.kind).await;
        self.connectivity.check_now().await;
        assessment.kind
    }

    /// Start the periodic connectivity heartbeat
    #[must_use]
    pub fn start_heartbeat(&self) -> HeartbeatHandle {
        Arc::clone(&self.connectivity).spawn(self.config.heartbeat_interval)
    }
}
