// ABOUTME: Pure settlement planning: XP reward, history record and weight ledger rollovers
// ABOUTME: Computed once from the session snapshot before any settlement write happens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Settlement planning.
//!
//! XP is a flat reward per completed exercise; partially completed sets earn
//! nothing extra. A ledger rollover is planned only for completed exercises
//! that have at least one set that is both ticked off and weighted; its weight
//! is the mean of those sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::session::XP_PER_COMPLETED_EXERCISE;
use crate::models::{ActiveSession, UserLevel, WeightUpdate, WorkoutHistoryRecord};

/// Everything `complete()` will write, derived from one session snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    /// XP granted for this workout
    pub xp_earned: u32,
    /// Permanent history record
    pub record: WorkoutHistoryRecord,
    /// Ledger rollovers, one per qualifying exercise
    pub weight_updates: Vec<WeightUpdate>,
}

impl SettlementPlan {
    /// Plan settlement of `session` as of `completed_at`
    #[must_use]
    pub fn for_session(session: &ActiveSession, completed_at: DateTime<Utc>) -> Self {
        let xp_earned = xp_for(session);
        Self {
            xp_earned,
            record: WorkoutHistoryRecord::from_session(session, xp_earned, completed_at),
            weight_updates: weight_updates_for(session),
        }
    }
}

/// XP reward for a session
#[must_use]
pub fn xp_for(session: &ActiveSession) -> u32 {
    u32::try_from(session.completed_exercise_count())
        .unwrap_or(u32::MAX)
        .saturating_mul(XP_PER_COMPLETED_EXERCISE)
}

/// Ledger rollovers for a session, in exercise order
#[must_use]
pub fn weight_updates_for(session: &ActiveSession) -> Vec<WeightUpdate> {
    session
        .progress
        .iter()
        .filter(|progress| progress.completed)
        .filter_map(|progress| {
            progress
                .qualifying_average_weight()
                .map(|weight| WeightUpdate {
                    exercise_id: progress.exercise_id.clone(),
                    weight,
                })
        })
        .collect()
}

/// Result of a successful `complete()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    /// Settled session
    pub session_id: Uuid,
    /// Id of the history record
    pub history_id: Uuid,
    /// XP granted by this workout
    pub xp_earned: u32,
    /// Cumulative XP after the grant
    pub total_xp: u64,
    /// Level after the grant
    pub level: UserLevel,
    /// The grant crossed a level boundary
    pub leveled_up: bool,
    /// Ledger rollovers that were written
    pub weight_updates: Vec<WeightUpdate>,
    /// Whole seconds between start and completion
    pub duration_secs: i64,
}
