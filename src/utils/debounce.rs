// ABOUTME: Keyed debouncer that coalesces bursts of values into one trailing action call
// ABOUTME: Generation counters discard superseded timers; flush drains pending values immediately
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Trailing-edge debounce keyed by an arbitrary hashable key.
//!
//! Every [`Debouncer::push`] replaces the pending value for its key and
//! restarts that key's timer. When a timer fires and nothing newer was pushed
//! for the key, the action runs once with the last value. Keys are independent:
//! a burst on one key never delays another.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::trace;

/// Async callback invoked with the settled value for a key
pub type DebounceAction<K, V> = Arc<dyn Fn(K, V) -> BoxFuture<'static, ()> + Send + Sync>;

struct Pending<V> {
    generation: u64,
    value: V,
}

/// Coalesces values per key over a fixed quiet window
pub struct Debouncer<K, V> {
    delay: Duration,
    pending: Arc<Mutex<HashMap<K, Pending<V>>>>,
    next_generation: Arc<AtomicU64>,
    action: DebounceAction<K, V>,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Create a debouncer that calls `action` after `delay` of quiet per key
    #[must_use]
    pub fn new(delay: Duration, action: DebounceAction<K, V>) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            action,
        }
    }

    /// Quiet window
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a value for `key`, superseding any pending one
    pub async fn push(&self, key: K, value: V) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .await
            .insert(key.clone(), Pending { generation, value });

        let pending = Arc::clone(&self.pending);
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let settled = {
                let mut guard = pending.lock().await;
                match guard.get(&key) {
                    Some(entry) if entry.generation == generation => guard.remove(&key),
                    _ => None,
                }
            };
            match settled {
                Some(entry) => action(key, entry.value).await,
                None => trace!(generation, "Debounce timer superseded"),
            }
        });
    }

    /// Run the action now for every pending key, in no particular order
    pub async fn flush(&self) {
        let drained: Vec<(K, V)> = {
            let mut guard = self.pending.lock().await;
            guard.drain().map(|(key, entry)| (key, entry.value)).collect()
        };
        for (key, value) in drained {
            (self.action)(key, value).await;
        }
    }

    /// Drop every pending value without running the action
    pub async fn discard(&self) {
        self.pending.lock().await.clear();
    }

    /// Number of keys waiting for their timer
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    type Log = Arc<Mutex<Vec<(&'static str, u32)>>>;

    fn recording(delay_ms: u64) -> (Debouncer<&'static str, u32>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let action: DebounceAction<&'static str, u32> =
            Arc::new(move |key: &'static str, value: u32| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().await.push((key, value));
                }
                .boxed()
            });
        (Debouncer::new(Duration::from_millis(delay_ms), action), log)
    }

    #[tokio::test]
    async fn test_burst_collapses_to_last_value() {
        let (debouncer, log) = recording(30);
        for value in 1..=5 {
            debouncer.push("reps", value).await;
        }
        sleep(Duration::from_millis(120)).await;

        assert_eq!(*log.lock().await, vec![("reps", 5)]);
        assert_eq!(debouncer.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (debouncer, log) = recording(30);
        debouncer.push("reps", 8).await;
        debouncer.push("weight", 100).await;
        sleep(Duration::from_millis(120)).await;

        let mut calls = log.lock().await.clone();
        calls.sort_unstable();
        assert_eq!(calls, vec![("reps", 8), ("weight", 100)]);
    }

    #[tokio::test]
    async fn test_flush_runs_pending_once() {
        let (debouncer, log) = recording(40);
        debouncer.push("weight", 60).await;
        debouncer.flush().await;
        assert_eq!(*log.lock().await, vec![("weight", 60)]);

        // The superseded timer must not fire a second call
        sleep(Duration::from_millis(120)).await;
        assert_eq!(log.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_discard_drops_values() {
        let (debouncer, log) = recording(20);
        debouncer.push("reps", 3).await;
        debouncer.discard().await;
        sleep(Duration::from_millis(80)).await;
        assert!(log.lock().await.is_empty());
    }
}
