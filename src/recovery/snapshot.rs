// ABOUTME: Ephemeral lifecycle snapshot taken when the app goes to the background
// ABOUTME: Advisory only; used to judge staleness and location change on return
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Where the user was when the app was hidden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleSnapshot {
    /// When the app went to the background
    pub taken_at: DateTime<Utc>,
    /// Screen or route the user was on
    pub location: String,
    /// Scroll position on that screen
    pub scroll_offset: f64,
}

impl LifecycleSnapshot {
    /// Snapshot stamped now
    #[must_use]
    pub fn now(location: impl Into<String>, scroll_offset: f64) -> Self {
        Self {
            taken_at: Utc::now(),
            location: location.into(),
            scroll_offset,
        }
    }

    /// Time spent in the background, clamped at zero
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.taken_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Local cache holding the most recent snapshot
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Replace the stored snapshot
    async fn save(&self, snapshot: LifecycleSnapshot);

    /// Remove and return the stored snapshot
    async fn take(&self) -> Option<LifecycleSnapshot>;

    /// Stored snapshot, left in place
    async fn peek(&self) -> Option<LifecycleSnapshot>;
}

/// Process-local snapshot cache
#[derive(Debug, Default)]
pub struct InMemorySnapshotCache {
    slot: RwLock<Option<LifecycleSnapshot>>,
}

impl InMemorySnapshotCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotCache for InMemorySnapshotCache {
    async fn save(&self, snapshot: LifecycleSnapshot) {
        *self.slot.write().await = Some(snapshot);
    }

    async fn take(&self) -> Option<LifecycleSnapshot> {
        self.slot.write().await.take()
    }

    async fn peek(&self) -> Option<LifecycleSnapshot> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_empties_the_cache() {
        let cache = InMemorySnapshotCache::new();
        cache.save(LifecycleSnapshot::now("/workout", 120.0)).await;

        assert_eq!(cache.peek().await.unwrap().location, "/workout");
        assert!(cache.take().await.is_some());
        assert!(cache.take().await.is_none());
    }

    #[test]
    fn test_age_is_never_negative() {
        let snapshot = LifecycleSnapshot::now("/", 0.0);
        let earlier = snapshot.taken_at - chrono::Duration::seconds(5);
        assert_eq!(snapshot.age(earlier), Duration::ZERO);
    }
}
