// ABOUTME: Database configuration types for the SQLite-backed session store
// ABOUTME: Parses DATABASE_URL into file or in-memory targets and reads AUTO_MIGRATE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{database, env_vars};
use crate::errors::{AppError, AppResult, ErrorCode};

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to `SQLite` database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error for empty strings and non-SQLite schemes
    pub fn parse_url(s: &str) -> AppResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::new(
                ErrorCode::ConfigInvalid,
                "DATABASE_URL must not be empty",
            ));
        }
        if let Some(path_str) = trimmed.strip_prefix("sqlite:") {
            if path_str == ":memory:" {
                return Ok(Self::Memory);
            }
            let path_str = path_str.strip_prefix("//").unwrap_or(path_str);
            return Ok(Self::SQLite {
                path: PathBuf::from(path_str),
            });
        }
        if trimmed.contains("://") {
            return Err(AppError::new(
                ErrorCode::ConfigInvalid,
                format!("Unsupported database scheme in '{trimmed}', only sqlite is supported"),
            ));
        }
        // Bare value: treat as SQLite file path
        Ok(Self::SQLite {
            path: PathBuf::from(trimmed),
        })
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        let path = database::DEFAULT_DATABASE_URL
            .strip_prefix("sqlite:")
            .unwrap_or(database::DEFAULT_DATABASE_URL);
        Self::SQLite {
            path: PathBuf::from(path),
        }
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Database connection and migration configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: DatabaseUrl,
    /// Create missing tables on startup
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DatabaseUrl::default(),
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` or `AUTO_MIGRATE` is malformed
    pub fn from_env() -> AppResult<Self> {
        let url = match env::var(env_vars::DATABASE_URL) {
            Ok(raw) => DatabaseUrl::parse_url(&raw)?,
            Err(_) => DatabaseUrl::default(),
        };
        let auto_migrate = env::var(env_vars::AUTO_MIGRATE)
            .unwrap_or_else(|_| "true".to_owned())
            .parse()
            .map_err(|e| {
                AppError::new(
                    ErrorCode::ConfigInvalid,
                    format!("Invalid AUTO_MIGRATE value: {e}"),
                )
            })?;
        Ok(Self { url, auto_migrate })
    }

    /// In-memory configuration used by tests and dry runs
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            url: DatabaseUrl::Memory,
            auto_migrate: true,
        }
    }
}
