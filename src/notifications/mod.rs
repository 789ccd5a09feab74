// ABOUTME: User-visible notification collaborator for session state changes
// ABOUTME: Tracing-only and broadcast-channel implementations for UIs and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Notifications surfaced to the user after `start`, `complete` and `cancel`,
//! and by the recovery layer after a long absence.
//!
//! The controller only depends on the [`Notifier`] trait. Presentation layers
//! subscribe to a [`BroadcastNotifier`]; headless tools use [`TracingNotifier`].

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::constants::notifications::BROADCAST_CHANNEL_CAPACITY;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Operation succeeded
    Success,
    /// Operation failed
    Failure,
    /// Advisory message, no state change
    Info,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// One user-visible message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity
    pub kind: NotificationKind,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification stamped now
    #[must_use]
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Success notification
    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message)
    }

    /// Failure notification
    #[must_use]
    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Failure, title, message)
    }

    /// Advisory notification
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message)
    }
}

/// Sink for user-visible notifications
pub trait Notifier: Send + Sync {
    /// Deliver a notification; delivery failures are not reported to the caller
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Failure => warn!(
                notification.kind = %notification.kind,
                notification.title = %notification.title,
                "{}",
                notification.message
            ),
            NotificationKind::Success | NotificationKind::Info => info!(
                notification.kind = %notification.kind,
                notification.title = %notification.title,
                "{}",
                notification.message
            ),
        }
    }
}

/// Fans notifications out to any number of subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastNotifier {
    /// Create a notifier with the default channel capacity
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a new subscriber
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        let title = notification.title.clone();
        if self.sender.send(notification).is_err() {
            debug!(notification.title = %title, "No notification subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let notifier = BroadcastNotifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.notify(Notification::success("Workout started", "Leg Day"));

        assert_eq!(first.recv().await.unwrap().title, "Workout started");
        assert_eq!(second.recv().await.unwrap().kind, NotificationKind::Success);
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::new();
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.notify(Notification::info("Progress saved", "Nothing to pause"));
    }
}
