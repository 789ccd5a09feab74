// ABOUTME: Centralized retry policy with capped exponential backoff
// ABOUTME: Used by critical-path session writes and by reconciliation passes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Retry policy shared by the session controller and the recovery layer.
//!
//! Only errors whose [`ErrorCode::is_retryable`](crate::errors::ErrorCode::is_retryable)
//! returns `true` are repeated; business-rule rejections and expired
//! authentication are returned on the first attempt.
//!
//! ## Backoff
//!
//! Delay before attempt `n + 1` is `initial_delay * 2^(n - 1)`, capped at `max_delay`:
//! with the recovery defaults that is 500ms, then 1s.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants::{database, recovery};
use crate::errors::{AppError, AppResult};

/// Attempt budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy with explicit values
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Run once, never retry
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Defaults for reconciliation passes (3 attempts, 500ms doubling, 4s cap)
    #[must_use]
    pub const fn reconciliation() -> Self {
        Self::new(
            recovery::MAX_RECONCILE_ATTEMPTS,
            Duration::from_millis(recovery::INITIAL_BACKOFF_MS),
            Duration::from_millis(recovery::MAX_BACKOFF_MS),
        )
    }

    /// Defaults for critical-path writes (3 attempts, 50ms doubling, 400ms cap)
    #[must_use]
    pub const fn critical_write() -> Self {
        Self::new(
            database::CRITICAL_WRITE_ATTEMPTS,
            Duration::from_millis(database::CRITICAL_WRITE_INITIAL_BACKOFF_MS),
            Duration::from_millis(database::CRITICAL_WRITE_MAX_BACKOFF_MS),
        )
    }

    /// Delay to wait after the given failed attempt (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %e,
                        "Giving up after max attempts"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable failure, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reconciliation()
    }
}

/// Map an elapsed timeout into an `OperationTimeout` error
pub(crate) fn timeout_error(operation: &str, budget: Duration) -> AppError {
    AppError::timeout(operation).with_details(serde_json::json!({
        "budget_ms": budget.as_millis() as u64,
    }))
}
