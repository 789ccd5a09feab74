// ABOUTME: Environment configuration for the workout engine: deployment mode and tuning knobs
// ABOUTME: Session timeouts, input debounce, recovery thresholds and retry budgets from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration.
//!
//! Every value has a built-in default matching the engine constants; variables
//! only need to be set to override them. Malformed values are rejected with
//! `ConfigInvalid` rather than silently replaced.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::database::DatabaseConfig;
use crate::constants::{env_vars, recovery, session};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::utils::retry::RetryPolicy;

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Session lifecycle tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Budget for the "already active?" lookup during start
    pub existing_session_check_timeout: Duration,
    /// Budget for the store delete during cancel
    pub cancel_delete_timeout: Duration,
    /// Quiet window for reps/weight keystrokes
    pub set_input_debounce: Duration,
    /// Retry policy for critical-path writes
    pub write_retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            existing_session_check_timeout: Duration::from_secs(
                session::EXISTING_SESSION_CHECK_TIMEOUT_SECS,
            ),
            cancel_delete_timeout: Duration::from_secs(session::CANCEL_DELETE_TIMEOUT_SECS),
            set_input_debounce: Duration::from_millis(session::SET_INPUT_DEBOUNCE_MS),
            write_retry: RetryPolicy::critical_write(),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but not a valid integer
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            existing_session_check_timeout: Duration::from_secs(env_parse(
                env_vars::SESSION_CHECK_TIMEOUT_SECS,
                session::EXISTING_SESSION_CHECK_TIMEOUT_SECS,
            )?),
            cancel_delete_timeout: Duration::from_secs(env_parse(
                env_vars::SESSION_CANCEL_TIMEOUT_SECS,
                session::CANCEL_DELETE_TIMEOUT_SECS,
            )?),
            set_input_debounce: Duration::from_millis(env_parse(
                env_vars::SET_INPUT_DEBOUNCE_MS,
                session::SET_INPUT_DEBOUNCE_MS,
            )?),
            write_retry: defaults.write_retry,
        })
    }
}

/// Recovery layer tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Background time after which a foreground reload becomes a recovery pass
    pub stale_snapshot_threshold: Duration,
    /// Background time after which the user is told they were away a long time
    pub long_absence_threshold: Duration,
    /// Period of the connectivity heartbeat
    pub heartbeat_interval: Duration,
    /// Budget for one heartbeat probe
    pub heartbeat_timeout: Duration,
    /// Coalescing window for reconciliation requests
    pub reconcile_debounce: Duration,
    /// Attempts and backoff for one reconciliation pass
    pub retry: RetryPolicy,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stale_snapshot_threshold: Duration::from_millis(recovery::STALE_SNAPSHOT_THRESHOLD_MS),
            long_absence_threshold: Duration::from_secs(recovery::LONG_ABSENCE_THRESHOLD_SECS),
            heartbeat_interval: Duration::from_secs(recovery::HEARTBEAT_INTERVAL_SECS),
            heartbeat_timeout: Duration::from_secs(recovery::HEARTBEAT_TIMEOUT_SECS),
            reconcile_debounce: Duration::from_millis(recovery::RECONCILE_DEBOUNCE_MS),
            retry: RetryPolicy::reconciliation(),
        }
    }
}

impl RecoveryConfig {
    /// Load recovery configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but not a valid integer
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let max_attempts = env_parse(
            env_vars::RECONCILE_MAX_ATTEMPTS,
            recovery::MAX_RECONCILE_ATTEMPTS,
        )?;
        Ok(Self {
            stale_snapshot_threshold: Duration::from_millis(env_parse(
                env_vars::RECOVERY_STALE_THRESHOLD_MS,
                recovery::STALE_SNAPSHOT_THRESHOLD_MS,
            )?),
            long_absence_threshold: Duration::from_secs(env_parse(
                env_vars::RECOVERY_LONG_ABSENCE_SECS,
                recovery::LONG_ABSENCE_THRESHOLD_SECS,
            )?),
            heartbeat_interval: Duration::from_secs(env_parse(
                env_vars::HEARTBEAT_INTERVAL_SECS,
                recovery::HEARTBEAT_INTERVAL_SECS,
            )?),
            heartbeat_timeout: defaults.heartbeat_timeout,
            reconcile_debounce: Duration::from_millis(env_parse(
                env_vars::RECONCILE_DEBOUNCE_MS,
                recovery::RECONCILE_DEBOUNCE_MS,
            )?),
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
        })
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Database location
    pub database: DatabaseConfig,
    /// Session lifecycle tuning
    pub session: SessionConfig,
    /// Recovery layer tuning
    pub recovery: RecoveryConfig,
}

impl EngineConfig {
    /// Load the full configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is malformed or the result fails validation
    pub fn from_env() -> AppResult<Self> {
        info!("Loading workout engine configuration from environment");
        let config = Self {
            environment: Environment::from_str_or_default(
                &env::var(env_vars::ENVIRONMENT).unwrap_or_else(|_| "development".to_owned()),
            ),
            database: DatabaseConfig::from_env()?,
            session: SessionConfig::from_env()?,
            recovery: RecoveryConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would disable a guard entirely
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first offending setting
    pub fn validate(&self) -> AppResult<()> {
        let non_zero = [
            (
                "session.existing_session_check_timeout",
                self.session.existing_session_check_timeout,
            ),
            (
                "session.cancel_delete_timeout",
                self.session.cancel_delete_timeout,
            ),
            ("recovery.heartbeat_interval", self.recovery.heartbeat_interval),
            ("recovery.heartbeat_timeout", self.recovery.heartbeat_timeout),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.recovery.retry.max_attempts == 0 || self.session.write_retry.max_attempts == 0 {
            return Err(invalid("retry attempts must be at least 1".to_owned()));
        }
        if self.recovery.long_absence_threshold < self.recovery.stale_snapshot_threshold {
            return Err(invalid(
                "recovery.long_absence_threshold must not be shorter than the stale threshold"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    /// Summary suitable for a startup log line
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "environment": self.environment.to_string(),
            "database": {
                "url": self.database.url.to_connection_string(),
                "auto_migrate": self.database.auto_migrate,
            },
            "session": {
                "check_timeout_ms": duration_ms(self.session.existing_session_check_timeout),
                "cancel_timeout_ms": duration_ms(self.session.cancel_delete_timeout),
                "set_input_debounce_ms": duration_ms(self.session.set_input_debounce),
                "write_attempts": self.session.write_retry.max_attempts,
            },
            "recovery": {
                "stale_threshold_ms": duration_ms(self.recovery.stale_snapshot_threshold),
                "long_absence_secs": self.recovery.long_absence_threshold.as_secs(),
                "heartbeat_interval_secs": self.recovery.heartbeat_interval.as_secs(),
                "reconcile_debounce_ms": duration_ms(self.recovery.reconcile_debounce),
                "reconcile_attempts": self.recovery.retry.max_attempts,
            },
        })
    }
}

fn invalid(message: String) -> AppError {
    AppError::new(ErrorCode::ConfigInvalid, message)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parse an environment variable, falling back to `default` when unset
fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(format!("Invalid {key} value '{raw}': {e}"))),
        Err(_) => Ok(default),
    }
}
