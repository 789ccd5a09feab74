// ABOUTME: Append-only workout history written once per settled session
// ABOUTME: Exercises are stored as a JSON document; listing exists for maintenance tooling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::Utc;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::{format_timestamp, parse_json, parse_timestamp, parse_uuid, run_migration, Database};
use crate::errors::DatabaseError;
use crate::models::WorkoutHistoryRecord;

const ENTITY: &str = "workout history";

impl Database {
    pub(super) async fn migrate_workout_history(&self) -> Result<(), DatabaseError> {
        run_migration(
            &self.pool,
            "workout_history",
            &[
                r"
                CREATE TABLE IF NOT EXISTS workout_history (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    session_id TEXT NOT NULL,
                    template_id TEXT NOT NULL,
                    template_name TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    exercises TEXT NOT NULL,
                    xp_earned INTEGER NOT NULL,
                    notes TEXT NOT NULL DEFAULT '',
                    completed INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL
                )
                ",
                "CREATE INDEX IF NOT EXISTS idx_workout_history_user ON workout_history(user_id, completed_at)",
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_workout_history_session ON workout_history(session_id)",
            ],
        )
        .await
    }

    /// Append a settled workout, once per session
    ///
    /// Appending a record for a session that already has one keeps the
    /// first row and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails
    pub async fn append_workout_history(
        &self,
        record: &WorkoutHistoryRecord,
    ) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r"
            INSERT INTO workout_history (
                id, user_id, session_id, template_id, template_name, started_at,
                completed_at, duration_secs, exercises, xp_earned, notes, completed, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(session_id) DO NOTHING
            ",
        )
        .bind(id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.session_id.to_string())
        .bind(&record.template_id)
        .bind(&record.template_name)
        .bind(format_timestamp(record.started_at))
        .bind(format_timestamp(record.completed_at))
        .bind(record.duration_secs)
        .bind(serde_json::to_string(&record.exercises)?)
        .bind(i64::from(record.xp_earned))
        .bind(&record.notes)
        .bind(record.completed)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        let stored: String =
            sqlx::query_scalar("SELECT id FROM workout_history WHERE session_id = ?1")
                .bind(record.session_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        if stored != id.to_string() {
            debug!(session.id = %record.session_id, "History already recorded for session");
        }
        parse_uuid(ENTITY, &stored)
    }

    /// Settled workouts of a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn list_workout_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WorkoutHistoryRecord>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, session_id, template_id, template_name, started_at, completed_at,
                   duration_secs, exercises, xp_earned, notes, completed
            FROM workout_history
            WHERE user_id = ?1
            ORDER BY completed_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let owner: String = row.try_get("user_id")?;
            let session_id: String = row.try_get("session_id")?;
            let started_at: String = row.try_get("started_at")?;
            let completed_at: String = row.try_get("completed_at")?;
            let exercises: String = row.try_get("exercises")?;
            let xp_earned: i64 = row.try_get("xp_earned")?;
            records.push(WorkoutHistoryRecord {
                user_id: parse_uuid(ENTITY, &owner)?,
                session_id: parse_uuid(ENTITY, &session_id)?,
                template_id: row.try_get("template_id")?,
                template_name: row.try_get("template_name")?,
                started_at: parse_timestamp(ENTITY, &started_at)?,
                completed_at: parse_timestamp(ENTITY, &completed_at)?,
                duration_secs: row.try_get("duration_secs")?,
                exercises: parse_json(ENTITY, "exercises", &exercises)?,
                xp_earned: u32::try_from(xp_earned).map_err(|e| {
                    DatabaseError::DataShapeMismatch {
                        entity_type: ENTITY,
                        details: format!("xp_earned {xp_earned}: {e}"),
                    }
                })?,
                notes: row.try_get("notes")?,
                completed: row.try_get("completed")?,
            });
        }
        Ok(records)
    }
}
