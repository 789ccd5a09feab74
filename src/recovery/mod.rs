// ABOUTME: Recovery layer: lifecycle snapshots, connectivity heartbeat and reconciliation passes
// ABOUTME: Re-derives session state from the store after interruptions instead of merging deltas
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Connectivity heartbeat
pub mod connectivity;
/// Debounced, single-flight reconciliation
pub mod coordinator;
/// Environment signal handling
pub mod signals;
/// Background snapshots
pub mod snapshot;

pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, ConnectivityStatus, HeartbeatHandle};
pub use coordinator::{
    PassKind, PassOutcome, ReconcileTarget, ReconciliationCoordinator, RecoveryEvent,
};
pub use signals::{assess_foreground, EnvironmentSignal, ForegroundAssessment, RecoveryLayer};
pub use snapshot::{InMemorySnapshotCache, LifecycleSnapshot, SnapshotCache};
