// ABOUTME: Session rule violations raised while mutating an active workout
// ABOUTME: Converted into AppError with business-rule error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

/// Rejections produced by the session state machine and data model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A session already exists, in memory or in the store
    #[error("a workout session is already active")]
    AlreadyActive {
        /// Id of the existing session when known
        session_id: Option<Uuid>,
    },

    /// The operation needs an active session
    #[error("no workout session is active")]
    NoActiveSession,

    /// The exercise id is not part of the session
    #[error("exercise '{exercise_id}' is not part of this session")]
    ExerciseNotFound {
        /// Requested exercise id
        exercise_id: String,
    },

    /// The set index does not exist for the exercise
    #[error("set index {index} is out of range for exercise '{exercise_id}' ({len} sets)")]
    SetIndexOutOfRange {
        /// Exercise the set belongs to
        exercise_id: String,
        /// Requested zero-based index
        index: usize,
        /// Number of sets present
        len: usize,
    },

    /// Removing the set would leave the exercise without sets
    #[error("exercise '{exercise_id}' must keep at least one set")]
    LastSetRemoval {
        /// Exercise the set belongs to
        exercise_id: String,
    },

    /// History is already written for this session; only settlement may follow
    #[error("workout '{session_id}' is being settled and can no longer be edited")]
    SettlementPending {
        /// Session whose history record is durable
        session_id: Uuid,
    },

    /// A field value is not acceptable
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        let (code, resource) = match &error {
            SessionError::AlreadyActive { session_id } => (
                ErrorCode::SessionAlreadyActive,
                session_id.map(|id| id.to_string()),
            ),
            SessionError::NoActiveSession => (ErrorCode::NoActiveSession, None),
            SessionError::ExerciseNotFound { exercise_id } => {
                (ErrorCode::ResourceNotFound, Some(exercise_id.clone()))
            }
            SessionError::SetIndexOutOfRange { exercise_id, .. } => {
                (ErrorCode::ValueOutOfRange, Some(exercise_id.clone()))
            }
            SessionError::LastSetRemoval { exercise_id } => {
                (ErrorCode::InvalidInput, Some(exercise_id.clone()))
            }
            SessionError::SettlementPending { session_id } => {
                (ErrorCode::InvalidInput, Some(session_id.to_string()))
            }
            SessionError::InvalidValue { .. } => (ErrorCode::InvalidInput, None),
        };

        let app_error = Self::new(code, error.to_string());
        match resource {
            Some(resource_id) => app_error.with_resource_id(resource_id),
            None => app_error,
        }
    }
}
