// ABOUTME: Active session repository implementation
// ABOUTME: Delegates the session store contract to the active_workouts table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use uuid::Uuid;

use super::ActiveSessionRepository;
use crate::database::Database;
use crate::errors::DatabaseError;
use crate::models::{ActiveSession, NewActiveSession, SessionRecordSummary};

/// `SQLite` implementation of `ActiveSessionRepository`
pub struct ActiveSessionRepositoryImpl {
    db: Database,
}

impl ActiveSessionRepositoryImpl {
    /// Create a new `ActiveSessionRepository` with the given database connection
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActiveSessionRepository for ActiveSessionRepositoryImpl {
    async fn get_active(&self, user_id: Uuid) -> Result<Option<ActiveSession>, DatabaseError> {
        self.db.get_active_workout(user_id).await
    }

    async fn insert(
        &self,
        user_id: Uuid,
        session: &NewActiveSession,
    ) -> Result<Uuid, DatabaseError> {
        self.db.insert_active_workout(user_id, session).await
    }

    async fn update(&self, session: &ActiveSession) -> Result<(), DatabaseError> {
        self.db.update_active_workout(session).await
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        self.db.delete_active_workout(session_id).await
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SessionRecordSummary>, DatabaseError> {
        self.db.list_active_workouts(user_id).await
    }

    async fn delete_incomplete_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.db.delete_incomplete_workouts(user_id).await
    }

    async fn mark_completed(&self, session_id: Uuid) -> Result<(), DatabaseError> {
        self.db.mark_workout_completed(session_id).await
    }

    async fn purge_completed(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.db.purge_completed_workouts(user_id).await
    }
}
