// ABOUTME: Workout history repository implementation
// ABOUTME: Append-only sink backed by the workout_history table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use uuid::Uuid;

use super::WorkoutHistoryRepository;
use crate::database::Database;
use crate::errors::DatabaseError;
use crate::models::WorkoutHistoryRecord;

/// `SQLite` implementation of `WorkoutHistoryRepository`
pub struct WorkoutHistoryRepositoryImpl {
    db: Database,
}

impl WorkoutHistoryRepositoryImpl {
    /// Create a new `WorkoutHistoryRepository` with the given database connection
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkoutHistoryRepository for WorkoutHistoryRepositoryImpl {
    async fn append(&self, record: &WorkoutHistoryRecord) -> Result<Uuid, DatabaseError> {
        self.db.append_workout_history(record).await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WorkoutHistoryRecord>, DatabaseError> {
        self.db.list_workout_history(user_id).await
    }
}
