// ABOUTME: Configuration module for the workout engine, loaded from environment variables
// ABOUTME: Database location, session timeouts, debounce windows and recovery thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the workout engine
//!
//! - **Database**: connection URL and migration switch
//! - **Environment**: deployment mode plus session and recovery tuning

/// Database connection configuration
pub mod database;
/// Deployment environment, session and recovery configuration
pub mod environment;

pub use database::{DatabaseConfig, DatabaseUrl};
pub use environment::{EngineConfig, Environment, RecoveryConfig, SessionConfig};
