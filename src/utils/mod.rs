// ABOUTME: Shared utilities used by the session controller and the recovery layer
// ABOUTME: Retry with capped backoff and keyed debouncing of rapid writes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Keyed debounce for coalescing rapid updates
pub mod debounce;
/// Retry policy with capped exponential backoff
pub mod retry;
