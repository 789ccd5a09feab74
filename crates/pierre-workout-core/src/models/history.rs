// ABOUTME: Immutable workout history record produced when a session is settled
// ABOUTME: Copies per-exercise sets and notes out of the active session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::{ActiveSession, SetRecord};

/// Per-exercise entry of a history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExercise {
    /// Exercise id
    pub id: String,
    /// Exercise name
    pub name: String,
    /// Planned sets
    pub target_sets: u32,
    /// Planned reps
    pub target_reps: String,
    /// Copy of the sets as they were at completion
    pub sets_performed: Vec<SetRecord>,
    /// Exercise marked completed
    pub completed: bool,
    /// Exercise notes
    pub notes: String,
}

/// Permanent, append-only record of a finished workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutHistoryRecord {
    /// Owner
    pub user_id: Uuid,
    /// Id of the active session this record settles
    pub session_id: Uuid,
    /// Source template id
    pub template_id: String,
    /// Source template name
    pub template_name: String,
    /// Workout start
    pub started_at: DateTime<Utc>,
    /// Settlement time
    pub completed_at: DateTime<Utc>,
    /// Whole seconds between start and settlement
    pub duration_secs: i64,
    /// One entry per exercise
    pub exercises: Vec<HistoryExercise>,
    /// XP granted by this workout
    pub xp_earned: u32,
    /// Workout notes
    pub notes: String,
    /// Always true for settled workouts
    pub completed: bool,
}

impl WorkoutHistoryRecord {
    /// Snapshot a session into a history record
    #[must_use]
    pub fn from_session(
        session: &ActiveSession,
        xp_earned: u32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let exercises = session
            .exercises
            .iter()
            .map(|definition| {
                let progress = session.progress_for(&definition.id).ok();
                HistoryExercise {
                    id: definition.id.clone(),
                    name: definition.name.clone(),
                    target_sets: definition.target_sets,
                    target_reps: definition.target_reps.clone(),
                    sets_performed: progress.map(|p| p.sets.clone()).unwrap_or_default(),
                    completed: progress.is_some_and(|p| p.completed),
                    notes: progress.map(|p| p.notes.clone()).unwrap_or_default(),
                }
            })
            .collect();

        Self {
            user_id: session.user_id,
            session_id: session.id,
            template_id: session.template_id.clone(),
            template_name: session.template_name.clone(),
            started_at: session.started_at,
            completed_at,
            duration_secs: session.elapsed(completed_at).num_seconds(),
            exercises,
            xp_earned,
            notes: session.notes.clone(),
            completed: true,
        }
    }
}
