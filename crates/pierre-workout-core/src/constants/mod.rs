// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Session timeouts, recovery thresholds, XP rewards, and database defaults

//! Constants module
//!
//! Defaults for the configurable values live here; `EngineConfig` reads the
//! environment and falls back to these.

/// Active session lifecycle
pub mod session {
    /// XP granted per exercise marked completed at settlement
    pub const XP_PER_COMPLETED_EXERCISE: u32 = 25;

    /// Budget for the "is a session already active" check during start
    pub const EXISTING_SESSION_CHECK_TIMEOUT_SECS: u64 = 5;

    /// Budget for the store delete issued by cancel
    pub const CANCEL_DELETE_TIMEOUT_SECS: u64 = 5;

    /// Coalescing window for keystroke-driven reps/weight input
    pub const SET_INPUT_DEBOUNCE_MS: u64 = 300;

    /// Every exercise keeps at least this many sets
    pub const MIN_SETS_PER_EXERCISE: usize = 1;
}

/// Recovery and resynchronization
pub mod recovery {
    /// A foreground return after this long is treated as a recovery pass
    pub const STALE_SNAPSHOT_THRESHOLD_MS: u64 = 2_000;

    /// A foreground return after this long shows a "welcome back" message
    pub const LONG_ABSENCE_THRESHOLD_SECS: u64 = 600;

    /// Connectivity heartbeat period
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

    /// Budget for one heartbeat query
    pub const HEARTBEAT_TIMEOUT_SECS: u64 = 5;

    /// Coalescing window for reconciliation requests
    pub const RECONCILE_DEBOUNCE_MS: u64 = 300;

    /// Attempts per reconciliation pass before giving up until the next trigger
    pub const MAX_RECONCILE_ATTEMPTS: u32 = 3;

    /// First backoff delay between reconciliation attempts
    pub const INITIAL_BACKOFF_MS: u64 = 500;

    /// Upper bound on the backoff delay
    pub const MAX_BACKOFF_MS: u64 = 4_000;

    /// Capacity of the recovery event broadcast channel
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;
}

/// XP and levels
pub mod progression {
    /// XP needed to advance one level
    pub const XP_PER_LEVEL: u64 = 100;
}

/// Store write retries on critical paths
pub mod database {
    /// Attempts for critical-path writes (initial persist, history insert)
    pub const CRITICAL_WRITE_ATTEMPTS: u32 = 3;

    /// First backoff delay between critical-path write attempts
    pub const CRITICAL_WRITE_INITIAL_BACKOFF_MS: u64 = 50;

    /// Upper bound on the critical-path backoff delay
    pub const CRITICAL_WRITE_MAX_BACKOFF_MS: u64 = 400;

    /// Default `SQLite` database location
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/workouts.db";
}

/// Service identity used in structured logs
pub mod service_names {
    /// Service name reported by the logging layer
    pub const WORKOUT_ENGINE: &str = "pierre-workout-engine";
}

/// Notification channel sizing
pub mod notifications {
    /// Capacity of the notification broadcast channel
    pub const BROADCAST_CHANNEL_CAPACITY: usize = 128;
}
