// ABOUTME: Level derivation from cumulative XP for the gamification display
// ABOUTME: Linear curve, one level per XP_PER_LEVEL points, starting at level 1
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use crate::constants::progression::XP_PER_LEVEL;

/// Level reached for a given cumulative XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLevel {
    /// Current level, starting at 1
    pub level: u32,
    /// XP accumulated inside the current level
    pub xp_into_level: u64,
    /// XP still needed to reach the next level
    pub xp_to_next_level: u64,
}

impl UserLevel {
    /// Derive the level from cumulative XP
    #[must_use]
    pub fn from_xp(total_xp: u64) -> Self {
        let completed_levels = total_xp / XP_PER_LEVEL;
        let xp_into_level = total_xp % XP_PER_LEVEL;
        Self {
            level: u32::try_from(completed_levels + 1).unwrap_or(u32::MAX),
            xp_into_level,
            xp_to_next_level: XP_PER_LEVEL - xp_into_level,
        }
    }
}
