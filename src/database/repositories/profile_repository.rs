// ABOUTME: Profile repository implementation
// ABOUTME: Handles the cumulative XP counter in user_progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use uuid::Uuid;

use super::ProfileRepository;
use crate::database::Database;
use crate::errors::DatabaseError;

/// `SQLite` implementation of `ProfileRepository`
pub struct ProfileRepositoryImpl {
    db: Database,
}

impl ProfileRepositoryImpl {
    /// Create a new `ProfileRepository` with the given database connection
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for ProfileRepositoryImpl {
    async fn current_xp(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        self.db.get_user_xp(user_id).await
    }

    async fn increment_xp(&self, user_id: Uuid, delta: u32) -> Result<u64, DatabaseError> {
        self.db.increment_user_xp(user_id, delta).await
    }
}
