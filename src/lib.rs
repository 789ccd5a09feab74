// ABOUTME: Main library entry point for the Pierre workout session engine
// ABOUTME: Active workout lifecycle, completion settlement, and interruption recovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Workout Engine
//!
//! Manages a single in-progress strength workout from start to completion or
//! cancellation.
//!
//! ## Architecture
//!
//! - **Session**: the lifecycle controller, the only writer of active sessions,
//!   workout history, XP and the weight ledger
//! - **Recovery**: snapshots on backgrounding, a connectivity heartbeat and
//!   debounced reconciliation passes that re-derive state from the store
//! - **Database**: SQLite persistence behind async repository traits
//! - **Config**: environment-driven configuration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pierre_workout_engine::auth::StaticAuthProvider;
//! use pierre_workout_engine::config::EngineConfig;
//! use pierre_workout_engine::engine::WorkoutEngine;
//! use pierre_workout_engine::errors::AppResult;
//! use pierre_workout_engine::notifications::TracingNotifier;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = EngineConfig::from_env()?;
//!     let auth = Arc::new(StaticAuthProvider::signed_in(Uuid::new_v4()));
//!     let engine = WorkoutEngine::connect(&config, auth, Arc::new(TracingNotifier)).await?;
//!
//!     if let Some(session) = engine.controller().load_active_session().await {
//!         println!("Resuming {}", session.template_name);
//!     }
//!     Ok(())
//! }
//! ```

/// Authentication collaborator
pub mod auth;

/// Configuration management
pub mod config;

/// Application constants
pub mod constants;

/// SQLite persistence and repositories
pub mod database;

/// Engine assembly
pub mod engine;

/// Unified error handling
pub mod errors;

/// Logging configuration and structured session events
pub mod logging;

/// Session data contracts
pub mod models;

/// User-facing notifications
pub mod notifications;

/// Interruption recovery
pub mod recovery;

/// Active session lifecycle
pub mod session;

/// Retry and debounce helpers
pub mod utils;
