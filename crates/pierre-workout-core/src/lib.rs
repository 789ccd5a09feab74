// ABOUTME: Core types and constants for the Pierre workout session engine
// ABOUTME: Foundation crate with error handling, session data contracts, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Workout Core
//!
//! Foundation crate providing the shared types and constants of the workout
//! session engine. Nothing in here performs I/O; persistence and orchestration
//! live in the `pierre_workout_engine` crate.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and domain-specific errors
//! - **constants**: Session, recovery, and progression constants
//! - **models**: Workout templates, active sessions, history records, and weight ledger entries

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Session data-shape contracts shared by the store, controller, and presentation layers
pub mod models;
