// ABOUTME: Data-shape contracts of the workout session engine
// ABOUTME: Re-exports templates, active sessions, history records, and ledger entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `WorkoutTemplate` / `ExerciseDefinition`: read-only input owned by the template subsystem
//! - `ActiveSession`: the single in-progress workout of a user, with its `ExerciseProgress`
//! - `WorkoutHistoryRecord`: immutable record produced by settlement
//! - `WeightLedgerEntry`: append-only working-weight history with an `is_latest` flag
//! - `UserLevel`: level derived from cumulative XP
//!
//! Session documents are persisted as JSON, so field names serialize in
//! `camelCase` to stay compatible with rows written by other clients.

mod history;
mod progression;
mod session;
mod template;
mod weight;

pub use history::{HistoryExercise, WorkoutHistoryRecord};
pub use progression::UserLevel;
pub use session::{
    ActiveSession, ExerciseProgress, ExerciseStatusUpdate, NewActiveSession, ProgressSummary,
    SessionRecordSummary, SetRecord,
};
pub use template::{ExerciseDefinition, WorkoutTemplate};
pub use weight::{WeightLedgerEntry, WeightUpdate};
