// ABOUTME: Workout template input consumed when a session starts
// ABOUTME: ExerciseDefinition and WorkoutTemplate are immutable to the session engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// One exercise of a workout template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    /// Exercise id, stable across sessions
    pub id: String,
    /// Display name
    pub name: String,
    /// Number of sets created when a session starts
    pub target_sets: u32,
    /// Free-form rep target such as "8-10"
    pub target_reps: String,
}

impl ExerciseDefinition {
    /// Create an exercise definition
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target_sets: u32,
        target_reps: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target_sets,
            target_reps: target_reps.into(),
        }
    }
}

/// Template a session is started from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    /// Template id
    pub id: String,
    /// Template name, e.g. "Leg Day"
    pub name: String,
    /// Exercises in display order
    pub exercises: Vec<ExerciseDefinition>,
}

impl WorkoutTemplate {
    /// Create a template
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        exercises: Vec<ExerciseDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            exercises,
        }
    }
}
