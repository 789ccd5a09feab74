// ABOUTME: SQLite database manager for active sessions, weight ledger, history and XP
// ABOUTME: Owns the sqlx pool, runs idempotent migrations and exposes per-table operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! Durable storage for the workout engine. Each table has its own module adding
//! methods to [`Database`]; the [`repositories`] module wraps those methods in
//! the async traits the session controller depends on.
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision so that
//! lexical ordering matches chronological ordering. Session documents are
//! stored as JSON text columns.

mod active_workouts;
mod user_progress;
mod weight_history;
mod workout_history;

/// Repository traits and their SQLite implementations
pub mod repositories;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DatabaseConfig, DatabaseUrl};
use crate::errors::DatabaseError;

/// Database manager for workout session storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect using a parsed configuration, migrating when `auto_migrate` is set
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the migrations fail
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db = Self::connect(&config.url).await?;
        if config.auto_migrate {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Open a pool without running migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn connect(url: &DatabaseUrl) -> Result<Self, DatabaseError> {
        let connection_string = url.to_connection_string();
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| DatabaseError::ConnectionError {
                context: format!("Invalid database url '{connection_string}': {e}"),
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives only as long as its connection
        let pool_options = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError {
                context: format!("Failed to open {connection_string}: {e}"),
            })?;

        debug!(database.url = %connection_string, "Database pool opened");
        Ok(Self { pool })
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create all tables and indexes if missing
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        self.migrate_active_workouts().await?;
        self.migrate_weight_history().await?;
        self.migrate_workout_history().await?;
        self.migrate_user_progress().await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Lightweight round trip used as a connectivity heartbeat
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot answer
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) async fn run_migration(
    pool: &Pool<Sqlite>,
    table: &str,
    statements: &[&str],
) -> Result<(), DatabaseError> {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError {
                context: format!("{table}: {e}"),
            })?;
    }
    Ok(())
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    entity_type: &'static str,
    raw: &str,
) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DataShapeMismatch {
            entity_type,
            details: format!("timestamp '{raw}': {e}"),
        })
}

pub(crate) fn parse_uuid(entity_type: &'static str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::DataShapeMismatch {
        entity_type,
        details: format!("id '{raw}': {e}"),
    })
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    entity_type: &'static str,
    column: &str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::DataShapeMismatch {
        entity_type,
        details: format!("{column}: {e}"),
    })
}
