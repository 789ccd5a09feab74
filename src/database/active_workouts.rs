// ABOUTME: Active workout table: at most one non-completed session document per user
// ABOUTME: Full-document put semantics, newest-first listing for orphan cleanup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{format_timestamp, parse_json, parse_timestamp, parse_uuid, run_migration, Database};
use crate::errors::DatabaseError;
use crate::models::{ActiveSession, NewActiveSession, SessionRecordSummary};

const ENTITY: &str = "active session";

impl Database {
    pub(super) async fn migrate_active_workouts(&self) -> Result<(), DatabaseError> {
        run_migration(
            &self.pool,
            "active_workouts",
            &[
                r"
                CREATE TABLE IF NOT EXISTS active_workouts (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    template_id TEXT NOT NULL,
                    template_name TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    exercises TEXT NOT NULL,
                    progress TEXT NOT NULL,
                    notes TEXT NOT NULL DEFAULT '',
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                ",
                "CREATE INDEX IF NOT EXISTS idx_active_workouts_user ON active_workouts(user_id, is_completed, created_at)",
            ],
        )
        .await
    }

    /// Newest non-completed session for a user
    ///
    /// # Errors
    ///
    /// Returns `DataShapeMismatch` if the stored document cannot be decoded,
    /// or a query error if the lookup fails
    pub async fn get_active_workout(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ActiveSession>, DatabaseError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, template_id, template_name, started_at,
                   exercises, progress, notes, is_completed
            FROM active_workouts
            WHERE user_id = ?1 AND is_completed = 0
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| session_from_row(&row)).transpose()
    }

    /// Insert a new session document; the store assigns the id
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails
    pub async fn insert_active_workout(
        &self,
        user_id: Uuid,
        session: &NewActiveSession,
    ) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        let now = format_timestamp(Utc::now());
        sqlx::query(
            r"
            INSERT INTO active_workouts (
                id, user_id, template_id, template_name, started_at,
                exercises, progress, notes, is_completed, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(&session.template_id)
        .bind(&session.template_name)
        .bind(format_timestamp(session.started_at))
        .bind(serde_json::to_string(&session.exercises)?)
        .bind(serde_json::to_string(&session.progress)?)
        .bind(&session.notes)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Overwrite the stored document with the given session
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row no longer exists
    pub async fn update_active_workout(&self, session: &ActiveSession) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE active_workouts
            SET progress = ?2, notes = ?3, is_completed = ?4, updated_at = ?5
            WHERE id = ?1
            ",
        )
        .bind(session.id.to_string())
        .bind(serde_json::to_string(&session.progress)?)
        .bind(&session.notes)
        .bind(session.is_completed)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                entity_type: ENTITY,
                entity_id: session.id.to_string(),
            });
        }
        Ok(())
    }

    /// Delete one session row, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_active_workout(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM active_workouts WHERE id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Non-completed sessions for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row has a malformed id or timestamp
    pub async fn list_active_workouts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SessionRecordSummary>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, created_at, is_completed
            FROM active_workouts
            WHERE user_id = ?1 AND is_completed = 0
            ORDER BY created_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let owner: String = row.try_get("user_id")?;
            let created_at: String = row.try_get("created_at")?;
            summaries.push(SessionRecordSummary {
                id: parse_uuid(ENTITY, &id)?,
                user_id: parse_uuid(ENTITY, &owner)?,
                created_at: parse_timestamp(ENTITY, &created_at)?,
                is_completed: row.try_get("is_completed")?,
            });
        }
        Ok(summaries)
    }

    /// Delete every non-completed session of a user
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_incomplete_workouts(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM active_workouts WHERE user_id = ?1 AND is_completed = 0")
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Flag a session as settled
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row no longer exists
    pub async fn mark_workout_completed(&self, session_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE active_workouts SET is_completed = 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(session_id.to_string())
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                entity_type: ENTITY,
                entity_id: session_id.to_string(),
            });
        }
        Ok(())
    }

    /// Remove settled rows of a user
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn purge_completed_workouts(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM active_workouts WHERE user_id = ?1 AND is_completed = 1")
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

fn session_from_row(row: &SqliteRow) -> Result<ActiveSession, DatabaseError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let started_at: String = row.try_get("started_at")?;
    let exercises: String = row.try_get("exercises")?;
    let progress: String = row.try_get("progress")?;

    let session = ActiveSession {
        id: parse_uuid(ENTITY, &id)?,
        user_id: parse_uuid(ENTITY, &user_id)?,
        template_id: row.try_get("template_id")?,
        template_name: row.try_get("template_name")?,
        started_at: parse_timestamp(ENTITY, &started_at)?,
        exercises: parse_json(ENTITY, "exercises", &exercises)?,
        progress: parse_json(ENTITY, "progress", &progress)?,
        notes: row.try_get("notes")?,
        is_completed: row.try_get("is_completed")?,
    };

    session
        .validate()
        .map_err(|e| DatabaseError::DataShapeMismatch {
            entity_type: ENTITY,
            details: e.to_string(),
        })?;
    Ok(session)
}
