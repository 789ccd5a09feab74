// ABOUTME: Unified error handling with error codes, context, and the AppError type
// ABOUTME: Domain errors (database, session rules) convert into AppError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation of the session engine reports an [`AppError`]
//! carrying an [`ErrorCode`]. Codes separate business-rule rejections
//! (`SessionAlreadyActive`) from transient store failures, which are the only
//! ones [`ErrorCode::is_retryable`] lets the retry policy repeat.

/// Database error types
pub mod database;

/// Session rule violations raised by the data model
pub mod session;

pub use database::DatabaseError;
pub use session::SessionError;

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use uuid::Uuid;

/// Standard error codes used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    /// No authenticated user is available
    AuthRequired,
    /// The credential could not be re-verified
    AuthExpired,

    // Validation
    /// The provided input is invalid
    InvalidInput,
    /// A numeric value is outside the accepted range
    ValueOutOfRange,

    // Resources
    /// The requested resource does not exist
    ResourceNotFound,
    /// A start was attempted while another session is active
    SessionAlreadyActive,
    /// The operation needs an active session and there is none
    NoActiveSession,

    // Transient
    /// An operation did not finish within its time budget
    OperationTimeout,
    /// A collaborator is temporarily unreachable
    ServiceUnavailable,

    // Configuration
    /// Configuration could not be loaded
    ConfigError,
    /// Configuration was loaded but is invalid
    ConfigInvalid,

    // Internal
    /// Unexpected internal failure
    InternalError,
    /// Database operation failed
    DatabaseError,
    /// Storage operation failed
    StorageError,
    /// Data could not be serialized or deserialized
    SerializationError,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required",
            Self::AuthExpired => "The authentication session has expired",
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::SessionAlreadyActive => "A workout session is already active",
            Self::NoActiveSession => "No workout session is active",
            Self::OperationTimeout => "The operation timed out",
            Self::ServiceUnavailable => "A required service is temporarily unavailable",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::StorageError => "Storage operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether an operation failing with this code may succeed when repeated
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::OperationTimeout
                | Self::ServiceUnavailable
                | Self::DatabaseError
                | Self::StorageError
        )
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// User ID if available
    pub user_id: Option<Uuid>,
    /// Resource ID if applicable (session id, exercise id)
    pub resource_id: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            user_id: None,
            resource_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the engine
#[derive(Debug)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a user ID to the error context
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context.user_id = Some(user_id);
        self
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether repeating the failed operation may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Authentication expired
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorCode::AuthExpired, "Authentication session has expired")
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Operation exceeded its time budget
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::OperationTimeout,
            format!("{} timed out", operation.into()),
        )
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
