// ABOUTME: Tests for environment-driven engine configuration
// ABOUTME: Runs serially because it mutates process environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::env;
use std::time::Duration;

use pierre_workout_engine::{
    config::{DatabaseUrl, EngineConfig, Environment},
    constants::env_vars,
    errors::ErrorCode,
};
use serial_test::serial;

const ALL_VARS: &[&str] = &[
    env_vars::DATABASE_URL,
    env_vars::AUTO_MIGRATE,
    env_vars::ENVIRONMENT,
    env_vars::SESSION_CHECK_TIMEOUT_SECS,
    env_vars::SESSION_CANCEL_TIMEOUT_SECS,
    env_vars::SET_INPUT_DEBOUNCE_MS,
    env_vars::RECOVERY_STALE_THRESHOLD_MS,
    env_vars::RECOVERY_LONG_ABSENCE_SECS,
    env_vars::HEARTBEAT_INTERVAL_SECS,
    env_vars::RECONCILE_DEBOUNCE_MS,
    env_vars::RECONCILE_MAX_ATTEMPTS,
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();

    let config = EngineConfig::from_env().unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert!(config.database.auto_migrate);
    assert_eq!(
        config.session.existing_session_check_timeout,
        Duration::from_secs(5)
    );
    assert_eq!(config.session.cancel_delete_timeout, Duration::from_secs(5));
    assert_eq!(config.session.set_input_debounce, Duration::from_millis(300));
    assert_eq!(
        config.recovery.stale_snapshot_threshold,
        Duration::from_secs(2)
    );
    assert_eq!(
        config.recovery.long_absence_threshold,
        Duration::from_secs(600)
    );
    assert_eq!(config.recovery.heartbeat_interval, Duration::from_secs(30));
    assert_eq!(config.recovery.reconcile_debounce, Duration::from_millis(300));
    assert_eq!(config.recovery.retry.max_attempts, 3);
}

#[test]
#[serial]
fn test_overrides_from_environment() {
    clear_env();
    env::set_var(env_vars::DATABASE_URL, "sqlite::memory:");
    env::set_var(env_vars::ENVIRONMENT, "production");
    env::set_var(env_vars::SESSION_CHECK_TIMEOUT_SECS, "2");
    env::set_var(env_vars::SET_INPUT_DEBOUNCE_MS, "150");
    env::set_var(env_vars::HEARTBEAT_INTERVAL_SECS, "10");
    env::set_var(env_vars::RECONCILE_MAX_ATTEMPTS, "5");

    let config = EngineConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.database.url, DatabaseUrl::Memory);
    assert!(config.environment.is_production());
    assert_eq!(
        config.session.existing_session_check_timeout,
        Duration::from_secs(2)
    );
    assert_eq!(config.session.set_input_debounce, Duration::from_millis(150));
    assert_eq!(config.recovery.heartbeat_interval, Duration::from_secs(10));
    assert_eq!(config.recovery.retry.max_attempts, 5);
}

#[test]
#[serial]
fn test_malformed_value_is_rejected() {
    clear_env();
    env::set_var(env_vars::RECONCILE_DEBOUNCE_MS, "soon");

    let err = EngineConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

#[test]
#[serial]
fn test_zero_timeout_fails_validation() {
    clear_env();
    env::set_var(env_vars::SESSION_CANCEL_TIMEOUT_SECS, "0");

    let err = EngineConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

#[test]
#[serial]
fn test_non_sqlite_database_url_is_rejected() {
    clear_env();
    env::set_var(env_vars::DATABASE_URL, "postgres://localhost/workouts");

    let err = EngineConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}
