// ABOUTME: Active workout session model with per-exercise progress and set records
// ABOUTME: Enforces contiguous set numbering, the one-set minimum, and progress/exercise pairing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::template::{ExerciseDefinition, WorkoutTemplate};
use crate::constants::session::MIN_SETS_PER_EXERCISE;
use crate::errors::SessionError;

/// One performed (or planned) set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    /// 1-based position within the exercise
    pub set_number: u32,
    /// Repetitions performed
    pub reps: u32,
    /// Working weight
    pub weight: f64,
    /// Whether the set was ticked off
    pub completed: bool,
}

impl SetRecord {
    /// A blank set at the given position
    #[must_use]
    pub const fn empty(set_number: u32) -> Self {
        Self {
            set_number,
            reps: 0,
            weight: 0.0,
            completed: false,
        }
    }

    /// Completed with a positive weight; only these sets feed the weight ledger
    #[must_use]
    pub fn counts_toward_weight(&self) -> bool {
        self.completed && self.weight > 0.0
    }
}

/// Progress of one exercise inside an active session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    /// Matches `ExerciseDefinition::id`
    pub exercise_id: String,
    /// Exercise marked done by the user
    pub completed: bool,
    /// Sets, numbered `1..=len`
    pub sets: Vec<SetRecord>,
    /// Per-exercise notes
    #[serde(default)]
    pub notes: String,
    /// Latest ledger weight captured when the session started
    #[serde(default)]
    pub previous_weight: Option<f64>,
}

impl ExerciseProgress {
    /// Initial progress for an exercise: `target_sets` blank sets (never fewer than one)
    #[must_use]
    pub fn for_exercise(definition: &ExerciseDefinition, previous_weight: Option<f64>) -> Self {
        let count = (definition.target_sets as usize).max(MIN_SETS_PER_EXERCISE);
        Self {
            exercise_id: definition.id.clone(),
            completed: false,
            sets: (1..=count).map(|n| SetRecord::empty(n as u32)).collect(),
            notes: String::new(),
            previous_weight,
        }
    }

    /// Append a blank set and return its number
    pub fn add_set(&mut self) -> u32 {
        let set_number = self.sets.len() as u32 + 1;
        self.sets.push(SetRecord::empty(set_number));
        set_number
    }

    /// Remove the set at `index` and renumber the remainder
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or the set is the last one
    pub fn remove_set(&mut self, index: usize) -> Result<SetRecord, SessionError> {
        self.check_index(index)?;
        if self.sets.len() <= MIN_SETS_PER_EXERCISE {
            return Err(SessionError::LastSetRemoval {
                exercise_id: self.exercise_id.clone(),
            });
        }
        let removed = self.sets.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Mutable access to one set
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range
    pub fn set_mut(&mut self, index: usize) -> Result<&mut SetRecord, SessionError> {
        self.check_index(index)?;
        Ok(&mut self.sets[index])
    }

    /// Merge a partial update into this progress entry
    ///
    /// # Errors
    ///
    /// Returns an error if the update carries an empty set list or invalid weights
    pub fn apply(&mut self, update: ExerciseStatusUpdate) -> Result<(), SessionError> {
        if let Some(sets) = update.sets {
            if sets.len() < MIN_SETS_PER_EXERCISE {
                return Err(SessionError::LastSetRemoval {
                    exercise_id: self.exercise_id.clone(),
                });
            }
            for set in &sets {
                validate_weight(set.weight)?;
            }
            self.sets = sets;
            self.renumber();
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        Ok(())
    }

    /// Mean weight over completed, weighted sets; `None` when no set qualifies
    #[must_use]
    pub fn qualifying_average_weight(&self) -> Option<f64> {
        let (sum, count) = self
            .sets
            .iter()
            .filter(|set| set.counts_toward_weight())
            .fold((0.0_f64, 0_u32), |(sum, count), set| {
                (sum + set.weight, count + 1)
            });
        (count > 0).then(|| sum / f64::from(count))
    }

    /// Sets whose numbers match their positions
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.sets
            .iter()
            .enumerate()
            .all(|(i, set)| set.set_number as usize == i + 1)
    }

    fn renumber(&mut self) {
        for (i, set) in self.sets.iter_mut().enumerate() {
            set.set_number = i as u32 + 1;
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index < self.sets.len() {
            Ok(())
        } else {
            Err(SessionError::SetIndexOutOfRange {
                exercise_id: self.exercise_id.clone(),
                index,
                len: self.sets.len(),
            })
        }
    }
}

/// Partial update merged by `update_exercise_status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStatusUpdate {
    /// New completion flag
    pub completed: Option<bool>,
    /// Replacement set list (renumbered on merge)
    pub sets: Option<Vec<SetRecord>>,
    /// Replacement notes
    pub notes: Option<String>,
}

impl ExerciseStatusUpdate {
    /// Update that only changes the completion flag
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Update that only replaces the sets
    #[must_use]
    pub fn sets(sets: Vec<SetRecord>) -> Self {
        Self {
            sets: Some(sets),
            ..Self::default()
        }
    }
}

/// Session built from a template, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActiveSession {
    /// Source template id
    pub template_id: String,
    /// Source template name
    pub template_name: String,
    /// When the user started the workout
    pub started_at: DateTime<Utc>,
    /// Snapshot of the template exercises
    pub exercises: Vec<ExerciseDefinition>,
    /// One entry per exercise
    pub progress: Vec<ExerciseProgress>,
    /// Workout-level notes
    pub notes: String,
}

impl NewActiveSession {
    /// Build the initial session; `previous_weights` maps exercise id to the latest ledger weight
    #[must_use]
    pub fn from_template(
        template: &WorkoutTemplate,
        previous_weights: &HashMap<String, f64>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let progress = template
            .exercises
            .iter()
            .map(|exercise| {
                ExerciseProgress::for_exercise(
                    exercise,
                    previous_weights.get(&exercise.id).copied(),
                )
            })
            .collect();

        Self {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            started_at,
            exercises: template.exercises.clone(),
            progress,
            notes: String::new(),
        }
    }

    /// Attach the store-assigned id
    #[must_use]
    pub fn into_session(self, id: Uuid, user_id: Uuid) -> ActiveSession {
        ActiveSession {
            id,
            user_id,
            template_id: self.template_id,
            template_name: self.template_name,
            started_at: self.started_at,
            exercises: self.exercises,
            progress: self.progress,
            notes: self.notes,
            is_completed: false,
        }
    }
}

/// The single in-progress workout of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    /// Store-assigned id
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// Source template id
    pub template_id: String,
    /// Source template name
    pub template_name: String,
    /// When the user started the workout
    pub started_at: DateTime<Utc>,
    /// Snapshot of the template exercises
    pub exercises: Vec<ExerciseDefinition>,
    /// One entry per exercise, matched by id
    pub progress: Vec<ExerciseProgress>,
    /// Workout-level notes
    pub notes: String,
    /// Set once settlement has run
    pub is_completed: bool,
}

/// Counts shown while a workout is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// Exercises marked completed
    pub completed_exercises: usize,
    /// Exercises in the session
    pub total_exercises: usize,
    /// Sets ticked off across all exercises
    pub completed_sets: usize,
    /// Sets across all exercises
    pub total_sets: usize,
}

impl ActiveSession {
    /// Progress entry for an exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is not part of the session
    pub fn progress_for(&self, exercise_id: &str) -> Result<&ExerciseProgress, SessionError> {
        self.progress
            .iter()
            .find(|p| p.exercise_id == exercise_id)
            .ok_or_else(|| SessionError::ExerciseNotFound {
                exercise_id: exercise_id.to_owned(),
            })
    }

    fn progress_mut(&mut self, exercise_id: &str) -> Result<&mut ExerciseProgress, SessionError> {
        self.progress
            .iter_mut()
            .find(|p| p.exercise_id == exercise_id)
            .ok_or_else(|| SessionError::ExerciseNotFound {
                exercise_id: exercise_id.to_owned(),
            })
    }

    /// Template definition for an exercise
    #[must_use]
    pub fn definition(&self, exercise_id: &str) -> Option<&ExerciseDefinition> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    /// Merge a partial update into one exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown or the update is invalid
    pub fn update_exercise_status(
        &mut self,
        exercise_id: &str,
        update: ExerciseStatusUpdate,
    ) -> Result<(), SessionError> {
        self.progress_mut(exercise_id)?.apply(update)
    }

    /// Replace one exercise's notes
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown
    pub fn update_exercise_notes(
        &mut self,
        exercise_id: &str,
        notes: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.progress_mut(exercise_id)?.notes = notes.into();
        Ok(())
    }

    /// Replace the workout notes
    pub fn update_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Append a blank set to an exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown
    pub fn add_set(&mut self, exercise_id: &str) -> Result<u32, SessionError> {
        Ok(self.progress_mut(exercise_id)?.add_set())
    }

    /// Remove a set from an exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown, or the set is the last one
    pub fn remove_set(&mut self, exercise_id: &str, index: usize) -> Result<(), SessionError> {
        self.progress_mut(exercise_id)?.remove_set(index).map(|_| ())
    }

    /// Set the reps of one set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown
    pub fn set_reps(
        &mut self,
        exercise_id: &str,
        index: usize,
        reps: u32,
    ) -> Result<(), SessionError> {
        self.progress_mut(exercise_id)?.set_mut(index)?.reps = reps;
        Ok(())
    }

    /// Set the weight of one set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown, or the weight is negative or not finite
    pub fn set_weight(
        &mut self,
        exercise_id: &str,
        index: usize,
        weight: f64,
    ) -> Result<(), SessionError> {
        validate_weight(weight)?;
        self.progress_mut(exercise_id)?.set_mut(index)?.weight = weight;
        Ok(())
    }

    /// Tick or untick one set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown
    pub fn set_completed(
        &mut self,
        exercise_id: &str,
        index: usize,
        completed: bool,
    ) -> Result<(), SessionError> {
        self.progress_mut(exercise_id)?.set_mut(index)?.completed = completed;
        Ok(())
    }

    /// Exercises marked completed
    #[must_use]
    pub fn completed_exercise_count(&self) -> usize {
        self.progress.iter().filter(|p| p.completed).count()
    }

    /// Time since the workout started, clamped at zero
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Counts for progress display
    #[must_use]
    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary {
            completed_exercises: self.completed_exercise_count(),
            total_exercises: self.exercises.len(),
            completed_sets: self
                .progress
                .iter()
                .flat_map(|p| &p.sets)
                .filter(|s| s.completed)
                .count(),
            total_sets: self.progress.iter().map(|p| p.sets.len()).sum(),
        }
    }

    /// Check the structural invariants of a loaded document
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated invariant
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.progress.len() != self.exercises.len() {
            return Err(SessionError::InvalidValue {
                field: "progress",
                reason: format!(
                    "{} progress entries for {} exercises",
                    self.progress.len(),
                    self.exercises.len()
                ),
            });
        }
        for exercise in &self.exercises {
            let progress = self.progress_for(&exercise.id)?;
            if progress.sets.len() < MIN_SETS_PER_EXERCISE || !progress.is_contiguous() {
                return Err(SessionError::InvalidValue {
                    field: "sets",
                    reason: format!("set numbering of '{}' is not 1..=n", exercise.id),
                });
            }
        }
        Ok(())
    }
}

/// Lightweight row listing used by orphan cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecordSummary {
    /// Session id
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// When the row was first written
    pub created_at: DateTime<Utc>,
    /// Completion flag
    pub is_completed: bool,
}

fn validate_weight(weight: f64) -> Result<(), SessionError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(SessionError::InvalidValue {
            field: "weight",
            reason: format!("{weight} is not a non-negative number"),
        })
    }
}
