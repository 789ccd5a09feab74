// ABOUTME: Connectivity heartbeat that probes the store on an interval
// ABOUTME: An offline-to-online transition triggers a routine reconciliation pass
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::coordinator::{PassKind, ReconciliationCoordinator, RecoveryEvent};
use crate::database::Database;
use crate::errors::AppResult;
use crate::utils::retry::timeout_error;

/// Cheap reachability check against the backing store
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Succeeds when the store answers
    async fn probe(&self) -> AppResult<()>;
}

#[async_trait]
impl ConnectivityProbe for Database {
    async fn probe(&self) -> AppResult<()> {
        self.ping().await.map_err(Into::into)
    }
}

/// Last known reachability of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    /// No probe has completed yet
    Unknown,
    /// Last probe succeeded
    Online,
    /// Last probe failed or timed out
    Offline,
}

/// Tracks store reachability and asks for a pass when it comes back
pub struct ConnectivityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    probe_timeout: Duration,
    status: watch::Sender<ConnectivityStatus>,
    coordinator: Option<ReconciliationCoordinator>,
}

impl ConnectivityMonitor {
    /// Monitor with no coordinator attached; transitions are only observed
    #[must_use]
    pub fn new(probe: Arc<dyn ConnectivityProbe>, probe_timeout: Duration) -> Self {
        let (status, _) = watch::channel(ConnectivityStatus::Unknown);
        Self {
            probe,
            probe_timeout,
            status,
            coordinator: None,
        }
    }

    /// Request a routine pass through `coordinator` whenever the store comes back
    #[must_use]
    pub fn with_coordinator(mut self, coordinator: ReconciliationCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Watch status changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.subscribe()
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ConnectivityStatus {
        *self.status.borrow()
    }

    /// Probe once and record the result
    pub async fn check_now(&self) -> ConnectivityStatus {
        let result = match timeout(self.probe_timeout, self.probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("connectivity probe", self.probe_timeout)),
        };
        let online = match result {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Connectivity probe failed");
                false
            }
        };
        self.report(online).await
    }

    /// Record an externally observed connectivity change
    pub async fn report(&self, online: bool) -> ConnectivityStatus {
        let next = if online {
            ConnectivityStatus::Online
        } else {
            ConnectivityStatus::Offline
        };
        let previous = self.status.send_replace(next);
        if previous == next {
            return next;
        }

        if online {
            info!(previous = ?previous, "Store reachable");
        } else {
            warn!(previous = ?previous, "Store unreachable");
        }

        if let Some(coordinator) = &self.coordinator {
            coordinator.emit(RecoveryEvent::ConnectivityChanged { online });
            if online && previous == ConnectivityStatus::Offline {
                coordinator.request(PassKind::Routine).await;
            }
        }
        next
    }

    /// Probe every `interval` until the returned handle is shut down or dropped
    #[must_use]
    pub fn spawn(self: Arc<Self>, interval: Duration) -> HeartbeatHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.check_now().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Connectivity heartbeat received shutdown signal");
                        break;
                    }
                }
            }
        });
        HeartbeatHandle {
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle owning the heartbeat task
pub struct HeartbeatHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    /// Stop the heartbeat and wait for the task to exit
    pub async fn shutdown(mut self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            debug!(error = ?e, "Heartbeat shutdown signal send failed (task already stopped)");
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Heartbeat task ended abnormally");
            }
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct SwitchProbe {
        down: AtomicBool,
        probes: AtomicU32,
    }

    #[async_trait]
    impl ConnectivityProbe for SwitchProbe {
        async fn probe(&self) -> AppResult<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                Err(AppError::database("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_status_follows_probe() {
        let probe = Arc::new(SwitchProbe::default());
        let monitor = ConnectivityMonitor::new(probe.clone(), Duration::from_millis(100));
        assert_eq!(monitor.status(), ConnectivityStatus::Unknown);

        assert_eq!(monitor.check_now().await, ConnectivityStatus::Online);
        probe.down.store(true, Ordering::SeqCst);
        assert_eq!(monitor.check_now().await, ConnectivityStatus::Offline);
        probe.down.store(false, Ordering::SeqCst);
        assert_eq!(monitor.check_now().await, ConnectivityStatus::Online);
    }

    #[tokio::test]
    async fn test_heartbeat_probes_until_shutdown() {
        let probe = Arc::new(SwitchProbe::default());
        let monitor = Arc::new(ConnectivityMonitor::new(
            probe.clone(),
            Duration::from_millis(100),
        ));

        let handle = Arc::clone(&monitor).spawn(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        let probes = probe.probes.load(Ordering::SeqCst);
        assert!(probes >= 2, "expected several probes, got {probes}");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(probe.probes.load(Ordering::SeqCst), probes);
    }
}
