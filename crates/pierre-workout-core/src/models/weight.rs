// ABOUTME: Weight history ledger entries with an is-latest flag per (user, exercise)
// ABOUTME: WeightUpdate is the rollover settlement asks the ledger to perform
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the weight history ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightLedgerEntry {
    /// Row id
    pub id: Uuid,
    /// Exercise id
    pub exercise_id: String,
    /// Owner
    pub user_id: Uuid,
    /// Working weight
    pub weight: f64,
    /// Only the newest row per (user, exercise) carries `true`
    pub is_latest: bool,
    /// Insert time
    pub recorded_at: DateTime<Utc>,
}

/// Ledger rollover derived from a completed exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightUpdate {
    /// Exercise id
    pub exercise_id: String,
    /// Mean weight of the completed, weighted sets
    pub weight: f64,
}
