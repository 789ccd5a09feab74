// ABOUTME: Weight ledger repository implementation
// ABOUTME: Delegates lookups and rollovers to the exercise_weight_history table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use uuid::Uuid;

use super::WeightLedgerRepository;
use crate::database::Database;
use crate::errors::DatabaseError;
use crate::models::WeightLedgerEntry;

/// `SQLite` implementation of `WeightLedgerRepository`
pub struct WeightLedgerRepositoryImpl {
    db: Database,
}

impl WeightLedgerRepositoryImpl {
    /// Create a new `WeightLedgerRepository` with the given database connection
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WeightLedgerRepository for WeightLedgerRepositoryImpl {
    async fn latest_weight(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Option<f64>, DatabaseError> {
        self.db.latest_exercise_weight(user_id, exercise_id).await
    }

    async fn record_latest(
        &self,
        user_id: Uuid,
        exercise_id: &str,
        weight: f64,
    ) -> Result<WeightLedgerEntry, DatabaseError> {
        self.db
            .record_latest_weight(user_id, exercise_id, weight)
            .await
    }

    async fn history(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        self.db.weight_history(user_id, exercise_id).await
    }

    async fn latest_entries(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        self.db.latest_weight_entries(user_id, exercise_id).await
    }
}
