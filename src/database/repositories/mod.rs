// ABOUTME: Repository traits the session engine depends on, plus their SQLite implementations
// ABOUTME: Lets the controller run against fakes in tests and the shared Database in production
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Repository pattern over the workout tables.
//!
//! Each trait is narrow: the controller needs `get`/`put`/`delete`/`list_by_user`
//! on the active session store, a rollover on the weight ledger, an append on
//! history and an increment on the profile. The `*RepositoryImpl` types
//! delegate to [`Database`] methods.

mod active_session_repository;
mod profile_repository;
mod weight_ledger_repository;
mod workout_history_repository;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

pub use active_session_repository::ActiveSessionRepositoryImpl;
pub use profile_repository::ProfileRepositoryImpl;
pub use weight_ledger_repository::WeightLedgerRepositoryImpl;
pub use workout_history_repository::WorkoutHistoryRepositoryImpl;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{
    ActiveSession, NewActiveSession, SessionRecordSummary, WeightLedgerEntry, WorkoutHistoryRecord,
};

/// Durable store of in-progress sessions
#[async_trait]
pub trait ActiveSessionRepository: Send + Sync {
    /// Newest non-completed session for the user
    async fn get_active(&self, user_id: Uuid) -> Result<Option<ActiveSession>, DatabaseError>;

    /// Persist a new session and return the store-assigned id
    async fn insert(&self, user_id: Uuid, session: &NewActiveSession)
        -> Result<Uuid, DatabaseError>;

    /// Overwrite the full session document
    async fn update(&self, session: &ActiveSession) -> Result<(), DatabaseError>;

    /// Delete a session by id, returning whether a row was removed
    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError>;

    /// Non-completed sessions of the user, newest first
    async fn list_by_user(&self, user_id: Uuid)
        -> Result<Vec<SessionRecordSummary>, DatabaseError>;

    /// Delete every non-completed session of the user
    async fn delete_incomplete_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError>;

    /// Flag a session as settled
    async fn mark_completed(&self, session_id: Uuid) -> Result<(), DatabaseError>;

    /// Remove settled rows of the user
    async fn purge_completed(&self, user_id: Uuid) -> Result<u64, DatabaseError>;
}

/// Weight history ledger
#[async_trait]
pub trait WeightLedgerRepository: Send + Sync {
    /// Latest working weight for (user, exercise)
    async fn latest_weight(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Option<f64>, DatabaseError>;

    /// Demote the previous latest row and append a new latest row
    async fn record_latest(
        &self,
        user_id: Uuid,
        exercise_id: &str,
        weight: f64,
    ) -> Result<WeightLedgerEntry, DatabaseError>;

    /// All rows for (user, exercise), newest first
    async fn history(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError>;

    /// Rows flagged latest for (user, exercise)
    async fn latest_entries(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError>;
}

/// Permanent, append-only workout history
#[async_trait]
pub trait WorkoutHistoryRepository: Send + Sync {
    /// Append a settled workout
    async fn append(&self, record: &WorkoutHistoryRecord) -> Result<Uuid, DatabaseError>;

    /// Settled workouts of the user, newest first
    async fn list_for_user(&self, user_id: Uuid)
        -> Result<Vec<WorkoutHistoryRecord>, DatabaseError>;
}

/// User profile XP counter
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Cumulative XP
    async fn current_xp(&self, user_id: Uuid) -> Result<u64, DatabaseError>;

    /// Add XP and return the new total
    async fn increment_xp(&self, user_id: Uuid, delta: u32) -> Result<u64, DatabaseError>;
}

/// The four stores the session controller writes to
#[derive(Clone)]
pub struct SessionStores {
    /// Active session store
    pub sessions: Arc<dyn ActiveSessionRepository>,
    /// Weight history ledger
    pub weights: Arc<dyn WeightLedgerRepository>,
    /// Permanent history
    pub history: Arc<dyn WorkoutHistoryRepository>,
    /// XP counter
    pub profiles: Arc<dyn ProfileRepository>,
}

impl SessionStores {
    /// All four stores backed by one SQLite database
    #[must_use]
    pub fn sqlite(db: &Database) -> Self {
        Self {
            sessions: Arc::new(ActiveSessionRepositoryImpl::new(db.clone())),
            weights: Arc::new(WeightLedgerRepositoryImpl::new(db.clone())),
            history: Arc::new(WorkoutHistoryRepositoryImpl::new(db.clone())),
            profiles: Arc::new(ProfileRepositoryImpl::new(db.clone())),
        }
    }
}
