// ABOUTME: Logging configuration and structured logging setup for the workout engine
// ABOUTME: Configures log levels and formatters, plus helpers for session lifecycle events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging built on `tracing-subscriber`

use std::env;
use std::io;

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use uuid::Uuid;

use crate::constants::service_names;

/// Logging configuration
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)] // Independent output toggles
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread information
    pub include_thread: bool,
    /// Include span open/close events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, testing, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for terminals and CLI output
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value, defaulting to pretty
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: service_names::WORKOUT_ENGINE.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        let format = LogFormat::from_str_or_default(
            env::var("LOG_FORMAT").as_deref().unwrap_or("pretty"),
        );
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        // Production gets the detailed fields by default
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: is_production || env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: is_production || env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::WORKOUT_ENGINE.into()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_owned()),
            environment,
        }
    }

    /// Configuration for the maintenance CLI: compact, warnings only unless overridden
    #[must_use]
    pub fn for_cli(verbose: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "warn" }.into(),
            format: LogFormat::Compact,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let base = env::var("RUST_LOG").map_or_else(
            |_| EnvFilter::new(&self.level),
            |directive| EnvFilter::new(&directive),
        );
        // Noise reduction applies regardless of RUST_LOG
        base.add_directive(
            "sqlx=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
        .add_directive(
            "sqlx::query=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
        .add_directive(
            format!("pierre_workout_engine={}", self.level)
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        )
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(span_events)
                    .json();
                registry.with(json_layer).try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(span_events);
                registry.with(pretty_layer).try_init()?;
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stderr)
                    .with_span_events(FmtSpan::NONE);
                registry.with(compact_layer).try_init()?;
            }
        }

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Workout engine logging initialized"
        );

        let config_summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "features": {
                    "location": self.include_location,
                    "thread": self.include_thread,
                    "spans": self.include_spans
                }
            }
        });
        info!("Logging configuration: {}", config_summary);
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events for session lifecycle and recovery
pub struct SessionLogger;

impl SessionLogger {
    /// A workout session started
    pub fn log_session_started(user_id: Uuid, session_id: Uuid, template_id: &str, exercises: usize) {
        info!(
            user.id = %user_id,
            session.id = %session_id,
            template.id = %template_id,
            session.exercises = exercises,
            "Workout session started"
        );
    }

    /// A workout session was settled
    pub fn log_session_completed(
        user_id: Uuid,
        session_id: Uuid,
        xp_earned: u32,
        weight_updates: usize,
        duration_secs: i64,
    ) {
        info!(
            user.id = %user_id,
            session.id = %session_id,
            settlement.xp_earned = xp_earned,
            settlement.weight_updates = weight_updates,
            session.duration_secs = duration_secs,
            "Workout session completed"
        );
    }

    /// A workout session was cancelled
    pub fn log_session_cancelled(user_id: Uuid, session_id: Uuid, store_deleted: bool) {
        info!(
            user.id = %user_id,
            session.id = %session_id,
            store.deleted = store_deleted,
            "Workout session cancelled"
        );
    }

    /// A non-critical store write failed and was skipped
    pub fn log_degraded_write(operation: &str, session_id: Option<Uuid>, error: &dyn std::fmt::Display) {
        warn!(
            store.operation = %operation,
            session.id = ?session_id,
            error = %error,
            "Non-critical store write failed, continuing"
        );
    }

    /// Surplus active sessions were removed
    pub fn log_orphans_removed(user_id: Uuid, removed: usize) {
        if removed > 0 {
            warn!(
                user.id = %user_id,
                orphans.removed = removed,
                "Removed orphaned active sessions"
            );
        }
    }

    /// A reconciliation pass finished
    pub fn log_reconcile_pass(kind: &str, found_session: bool, duration_ms: u64) {
        info!(
            reconcile.kind = %kind,
            reconcile.found_session = found_session,
            reconcile.duration_ms = duration_ms,
            "Reconciliation pass finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("other"), LogFormat::Pretty);
    }

    #[test]
    fn test_cli_config_is_quiet_by_default() {
        let config = LoggingConfig::for_cli(false);
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(LoggingConfig::for_cli(true).level, "debug");
    }
}
