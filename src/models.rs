// ABOUTME: Session data-shape contracts re-exported from pierre-workout-core
// ABOUTME: Templates, active sessions, history records, ledger entries and levels
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Data models

pub use pierre_workout_core::models::*;
