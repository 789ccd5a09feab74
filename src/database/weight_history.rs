// ABOUTME: Exercise weight history ledger with an is_latest flag per (user, exercise)
// ABOUTME: Rollover flips the previous latest row and inserts the new one in a single transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid, run_migration, Database};
use crate::errors::DatabaseError;
use crate::models::WeightLedgerEntry;

const ENTITY: &str = "weight ledger entry";

impl Database {
    pub(super) async fn migrate_weight_history(&self) -> Result<(), DatabaseError> {
        run_migration(
            &self.pool,
            "exercise_weight_history",
            &[
                r"
                CREATE TABLE IF NOT EXISTS exercise_weight_history (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    exercise_id TEXT NOT NULL,
                    weight REAL NOT NULL,
                    is_latest INTEGER NOT NULL DEFAULT 1,
                    recorded_at TEXT NOT NULL
                )
                ",
                "CREATE INDEX IF NOT EXISTS idx_weight_history_latest ON exercise_weight_history(user_id, exercise_id, is_latest)",
            ],
        )
        .await
    }

    /// Weight of the latest ledger row for (user, exercise)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn latest_exercise_weight(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Option<f64>, DatabaseError> {
        let weight = sqlx::query_scalar::<_, f64>(
            r"
            SELECT weight FROM exercise_weight_history
            WHERE user_id = ?1 AND exercise_id = ?2 AND is_latest = 1
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(weight)
    }

    /// Ledger rollover: demote every latest row, then append the new latest row
    ///
    /// # Errors
    ///
    /// Returns an error if either statement fails; nothing is written in that case
    pub async fn record_latest_weight(
        &self,
        user_id: Uuid,
        exercise_id: &str,
        weight: f64,
    ) -> Result<WeightLedgerEntry, DatabaseError> {
        let entry = WeightLedgerEntry {
            id: Uuid::new_v4(),
            exercise_id: exercise_id.to_owned(),
            user_id,
            weight,
            is_latest: true,
            recorded_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            UPDATE exercise_weight_history SET is_latest = 0
            WHERE user_id = ?1 AND exercise_id = ?2 AND is_latest = 1
            ",
        )
        .bind(user_id.to_string())
        .bind(exercise_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO exercise_weight_history (id, user_id, exercise_id, weight, is_latest, recorded_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            ",
        )
        .bind(entry.id.to_string())
        .bind(user_id.to_string())
        .bind(exercise_id)
        .bind(weight)
        .bind(format_timestamp(entry.recorded_at))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Full ledger for (user, exercise), newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn weight_history(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, weight, is_latest, recorded_at
            FROM exercise_weight_history
            WHERE user_id = ?1 AND exercise_id = ?2
            ORDER BY recorded_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Rows flagged latest for (user, exercise); more than one means the flag was corrupted
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn latest_weight_entries(
        &self,
        user_id: Uuid,
        exercise_id: &str,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, weight, is_latest, recorded_at
            FROM exercise_weight_history
            WHERE user_id = ?1 AND exercise_id = ?2 AND is_latest = 1
            ORDER BY recorded_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Latest row of every exercise the user has a weight for
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn latest_weights_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WeightLedgerEntry>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, weight, is_latest, recorded_at
            FROM exercise_weight_history
            WHERE user_id = ?1 AND is_latest = 1
            ORDER BY exercise_id
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<WeightLedgerEntry, DatabaseError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let recorded_at: String = row.try_get("recorded_at")?;
    Ok(WeightLedgerEntry {
        id: parse_uuid(ENTITY, &id)?,
        exercise_id: row.try_get("exercise_id")?,
        user_id: parse_uuid(ENTITY, &user_id)?,
        weight: row.try_get("weight")?,
        is_latest: row.try_get("is_latest")?,
        recorded_at: parse_timestamp(ENTITY, &recorded_at)?,
    })
}
