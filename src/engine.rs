// ABOUTME: Wires the session controller, debounced input and recovery layer over one database
// ABOUTME: Entry point for hosts embedding the workout session engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthProvider;
use crate::config::EngineConfig;
use crate::database::repositories::SessionStores;
use crate::database::Database;
use crate::errors::AppResult;
use crate::notifications::Notifier;
use crate::recovery::{
    ConnectivityMonitor, ConnectivityProbe, InMemorySnapshotCache, ReconcileTarget,
    ReconciliationCoordinator, RecoveryLayer,
};
use crate::session::{SessionController, SetInputBuffer};

/// Fully assembled engine for one signed-in client
pub struct WorkoutEngine {
    database: Database,
    controller: Arc<SessionController>,
    input: SetInputBuffer,
    recovery: RecoveryLayer,
}

impl WorkoutEngine {
    /// Connect to the configured database and assemble the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened or migrated
    pub async fn connect(
        config: &EngineConfig,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        config.validate()?;
        let database = Database::new(&config.database).await?;
        info!(database = %config.database.url, "Workout engine database ready");
        Ok(Self::with_database(config, database, auth, notifier))
    }

    /// Assemble the engine over an already-open database
    #[must_use]
    pub fn with_database(
        config: &EngineConfig,
        database: Database,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let controller = Arc::new(SessionController::new(
            SessionStores::sqlite(&database),
            Arc::clone(&auth),
            Arc::clone(&notifier),
            config.session.clone(),
        ));
        let coordinator = ReconciliationCoordinator::new(
            Arc::clone(&controller) as Arc<dyn ReconcileTarget>,
            auth,
            &config.recovery,
        );
        let connectivity = Arc::new(
            ConnectivityMonitor::new(
                Arc::new(database.clone()) as Arc<dyn ConnectivityProbe>,
                config.recovery.heartbeat_timeout,
            )
            .with_coordinator(coordinator.clone()),
        );
        let recovery = RecoveryLayer::new(
            config.recovery.clone(),
            Arc::new(InMemorySnapshotCache::new()),
            coordinator,
            connectivity,
            notifier,
        );
        let input = SetInputBuffer::new(Arc::clone(&controller));

        Self {
            database,
            controller,
            input,
            recovery,
        }
    }

    /// Session controller
    #[must_use]
    pub const fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Debounced reps/weight input
    #[must_use]
    pub const fn input(&self) -> &SetInputBuffer {
        &self.input
    }

    /// Recovery layer
    #[must_use]
    pub const fn recovery(&self) -> &RecoveryLayer {
        &self.recovery
    }

    /// Underlying database
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Flush pending input and close the pool
    pub async fn shutdown(&self) {
        self.input.flush().await;
        self.database.close().await;
    }
}
