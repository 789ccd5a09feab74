// ABOUTME: Structured error types for session store, ledger, and history persistence
// ABOUTME: Provides domain-specific database errors that convert into AppError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Errors raised by repository implementations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection could not be established or was lost
    #[error("Database connection error: {context}")]
    ConnectionError {
        /// What was being attempted
        context: String,
    },

    /// A query failed to execute
    #[error("Database query error: {context}")]
    QueryError {
        /// What was being attempted
        context: String,
    },

    /// Schema migration failed
    #[error("Database migration error: {context}")]
    MigrationError {
        /// What was being attempted
        context: String,
    },

    /// A referenced row does not exist
    #[error("{entity_type} '{entity_id}' not found")]
    NotFound {
        /// Kind of entity, e.g. "active session"
        entity_type: &'static str,
        /// Identifier that was looked up
        entity_id: String,
    },

    /// A persisted document no longer matches the expected shape
    #[error("Malformed {entity_type} data: {details}")]
    DataShapeMismatch {
        /// Kind of entity, e.g. "active session"
        entity_type: &'static str,
        /// Decoder message
        details: String,
    },

    /// A value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        let code = match &error {
            DatabaseError::NotFound { .. } => ErrorCode::ResourceNotFound,
            DatabaseError::DataShapeMismatch { .. } | DatabaseError::Serialization(_) => {
                ErrorCode::SerializationError
            }
            DatabaseError::ConnectionError { .. } => ErrorCode::ServiceUnavailable,
            DatabaseError::QueryError { .. } | DatabaseError::MigrationError { .. } => {
                ErrorCode::DatabaseError
            }
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionError {
                    context: error.to_string(),
                }
            }
            _ => Self::QueryError {
                context: error.to_string(),
            },
        }
    }
}
