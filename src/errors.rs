// ABOUTME: Unified error handling re-exported from pierre-workout-core
// ABOUTME: Single import point for AppError, ErrorCode, and domain errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! The error types live in the core crate so that data-model code and the
//! engine share them; this module re-exports them under the familiar path.

pub use pierre_workout_core::errors::*;
