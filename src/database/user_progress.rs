// ABOUTME: Cumulative XP per user, incremented once per settled workout
// ABOUTME: Upsert keeps a single row per user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::Utc;
use uuid::Uuid;

use super::{format_timestamp, run_migration, Database};
use crate::errors::DatabaseError;

impl Database {
    pub(super) async fn migrate_user_progress(&self) -> Result<(), DatabaseError> {
        run_migration(
            &self.pool,
            "user_progress",
            &[r"
            CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT PRIMARY KEY,
                xp INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "],
        )
        .await
    }

    /// Cumulative XP, zero for users without a row
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_xp(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let xp = sqlx::query_scalar::<_, i64>("SELECT xp FROM user_progress WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or(0);
        Ok(u64::try_from(xp).unwrap_or(0))
    }

    /// Add `delta` to the user's XP and return the new total
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn increment_user_xp(&self, user_id: Uuid, delta: u32) -> Result<u64, DatabaseError> {
        let total = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO user_progress (user_id, xp, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                xp = xp + ?2,
                updated_at = ?3
            RETURNING xp
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(delta))
        .bind(format_timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}
