// ABOUTME: Debounced reps/weight input in front of the controller's write-now API
// ABOUTME: Keystrokes coalesce per (exercise, set, field); structural edits and completion flush first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::warn;

use super::controller::SessionController;
use super::settlement::CompletionSummary;
use crate::errors::{AppResult, SessionError};
use crate::models::ExerciseStatusUpdate;
use crate::utils::debounce::{DebounceAction, Debouncer};

/// Field of a set edited by keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetField {
    /// Repetitions
    Reps,
    /// Weight
    Weight,
}

/// Identifies one input box
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetInputKey {
    /// Exercise id
    pub exercise_id: String,
    /// Zero-based set index
    pub index: usize,
    /// Edited field
    pub field: SetField,
}

/// Value typed into an input box
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetInputValue {
    /// Repetitions
    Reps(u32),
    /// Weight
    Weight(f64),
}

/// Coalesces reps/weight keystrokes before they reach the controller
pub struct SetInputBuffer {
    controller: Arc<SessionController>,
    debouncer: Debouncer<SetInputKey, SetInputValue>,
}

impl SetInputBuffer {
    /// Buffer using the controller's configured debounce window
    #[must_use]
    pub fn new(controller: Arc<SessionController>) -> Self {
        let delay = controller.config().set_input_debounce;
        Self::with_delay(controller, delay)
    }

    /// Buffer with an explicit debounce window
    #[must_use]
    pub fn with_delay(controller: Arc<SessionController>, delay: Duration) -> Self {
        let target = Arc::clone(&controller);
        let action: DebounceAction<SetInputKey, SetInputValue> =
            Arc::new(move |key: SetInputKey, value: SetInputValue| {
                let target = Arc::clone(&target);
                async move { write_through(&target, &key, value).await }.boxed()
            });
        Self {
            controller,
            debouncer: Debouncer::new(delay, action),
        }
    }

    /// Queue a reps change
    pub async fn set_reps(&self, exercise_id: &str, index: usize, reps: u32) {
        self.debouncer
            .push(key(exercise_id, index, SetField::Reps), SetInputValue::Reps(reps))
            .await;
    }

    /// Queue a weight change
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite weights immediately
    pub async fn set_weight(&self, exercise_id: &str, index: usize, weight: f64) -> AppResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SessionError::InvalidValue {
                field: "weight",
                reason: format!("{weight} is not a non-negative number"),
            }
            .into());
        }
        self.debouncer
            .push(
                key(exercise_id, index, SetField::Weight),
                SetInputValue::Weight(weight),
            )
            .await;
        Ok(())
    }

    /// Tick or untick a set; pending keystrokes are written first
    ///
    /// # Errors
    ///
    /// Returns the controller error for the toggle itself
    pub async fn set_completed(
        &self,
        exercise_id: &str,
        index: usize,
        completed: bool,
    ) -> AppResult<()> {
        self.flush().await;
        self.controller
            .set_completed(exercise_id, index, completed)
            .await
    }

    /// Append a set; pending keystrokes are written first
    ///
    /// # Errors
    ///
    /// Returns the controller error for the new set
    pub async fn add_set(&self, exercise_id: &str) -> AppResult<()> {
        self.flush().await;
        self.controller.add_set(exercise_id).await
    }

    /// Remove a set; pending keystrokes are written before indices shift
    ///
    /// # Errors
    ///
    /// Returns the controller error for the removal
    pub async fn remove_set(&self, exercise_id: &str, index: usize) -> AppResult<()> {
        self.flush().await;
        self.controller.remove_set(exercise_id, index).await
    }

    /// Merge an exercise update; pending keystrokes are written first
    ///
    /// # Errors
    ///
    /// Returns the controller error for the update
    pub async fn update_exercise_status(
        &self,
        exercise_id: &str,
        update: ExerciseStatusUpdate,
    ) -> AppResult<()> {
        self.flush().await;
        self.controller
            .update_exercise_status(exercise_id, update)
            .await
    }

    /// Flush pending keystrokes, then settle the session
    ///
    /// # Errors
    ///
    /// Returns the controller's completion error
    pub async fn complete(&self) -> AppResult<CompletionSummary> {
        self.flush().await;
        self.controller.complete().await
    }

    /// Drop pending keystrokes, then cancel the session
    ///
    /// # Errors
    ///
    /// Returns the controller's cancel error
    pub async fn cancel(&self) -> AppResult<bool> {
        self.debouncer.discard().await;
        self.controller.cancel().await
    }

    /// Write every pending keystroke now
    pub async fn flush(&self) {
        self.debouncer.flush().await;
    }

    /// Number of input boxes with unwritten values
    pub async fn pending(&self) -> usize {
        self.debouncer.pending_count().await
    }
}

fn key(exercise_id: &str, index: usize, field: SetField) -> SetInputKey {
    SetInputKey {
        exercise_id: exercise_id.to_owned(),
        index,
        field,
    }
}

async fn write_through(controller: &SessionController, key: &SetInputKey, value: SetInputValue) {
    let result = match value {
        SetInputValue::Reps(reps) => controller.set_reps(&key.exercise_id, key.index, reps).await,
        SetInputValue::Weight(weight) => {
            controller
                .set_weight(&key.exercise_id, key.index, weight)
                .await
        }
    };
    if let Err(e) = result {
        warn!(
            exercise.id = %key.exercise_id,
            set.index = key.index,
            field = ?key.field,
            error = %e,
            "Debounced set input write failed"
        );
    }
}
