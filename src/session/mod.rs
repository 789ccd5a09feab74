// ABOUTME: Active workout session engine: lifecycle controller, settlement and debounced input
// ABOUTME: The controller is the only writer of active sessions, history, XP and the weight ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Session lifecycle controller
pub mod controller;
/// Debounced reps/weight input
pub mod input;
/// Settlement planning
pub mod settlement;

pub use controller::SessionController;
pub use input::{SetField, SetInputBuffer, SetInputKey, SetInputValue};
pub use settlement::{CompletionSummary, SettlementPlan};
