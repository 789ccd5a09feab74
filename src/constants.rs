// ABOUTME: Application constants re-exported from pierre-workout-core
// ABOUTME: Adds environment-variable names read by the configuration layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module

pub use pierre_workout_core::constants::*;

/// Environment variable names understood by `EngineConfig::from_env`
pub mod env_vars {
    /// Database connection string
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Run migrations on startup
    pub const AUTO_MIGRATE: &str = "AUTO_MIGRATE";
    /// Deployment environment
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    /// Existing-session check budget during start, in seconds
    pub const SESSION_CHECK_TIMEOUT_SECS: &str = "SESSION_CHECK_TIMEOUT_SECS";
    /// Cancel delete budget, in seconds
    pub const SESSION_CANCEL_TIMEOUT_SECS: &str = "SESSION_CANCEL_TIMEOUT_SECS";
    /// Reps/weight input coalescing window, in milliseconds
    pub const SET_INPUT_DEBOUNCE_MS: &str = "SET_INPUT_DEBOUNCE_MS";
    /// Foreground staleness threshold, in milliseconds
    pub const RECOVERY_STALE_THRESHOLD_MS: &str = "RECOVERY_STALE_THRESHOLD_MS";
    /// Long-absence threshold, in seconds
    pub const RECOVERY_LONG_ABSENCE_SECS: &str = "RECOVERY_LONG_ABSENCE_SECS";
    /// Heartbeat period, in seconds
    pub const HEARTBEAT_INTERVAL_SECS: &str = "HEARTBEAT_INTERVAL_SECS";
    /// Reconciliation coalescing window, in milliseconds
    pub const RECONCILE_DEBOUNCE_MS: &str = "RECONCILE_DEBOUNCE_MS";
    /// Attempts per reconciliation pass
    pub const RECONCILE_MAX_ATTEMPTS: &str = "RECONCILE_MAX_ATTEMPTS";
}
