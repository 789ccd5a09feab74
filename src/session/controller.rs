// ABOUTME: Session lifecycle controller: start, per-set mutation, pause, complete, cancel
// ABOUTME: Holds the current session in memory and writes every change through to the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Session Lifecycle Controller
//!
//! States are `ABSENT -> ACTIVE -> {COMPLETED, CANCELLED}`. Only `ACTIVE` is
//! mutable, and every mutation is persisted before the in-memory copy is
//! replaced, so `pause()` has nothing to save.
//!
//! The single-active-session invariant is enforced advisorily (an in-flight
//! guard plus a store lookup before `start`) and defensively (every start
//! clears the user's incomplete rows, every load runs orphan cleanup). There is
//! no cross-instance locking; two controllers for the same user can race, and
//! `cleanup_orphans` converges them to the newest session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::settlement::{CompletionSummary, SettlementPlan};
use crate::auth::AuthProvider;
use crate::config::SessionConfig;
use crate::database::repositories::SessionStores;
use crate::errors::{AppError, AppResult, DatabaseError, SessionError};
use crate::logging::SessionLogger;
use crate::models::{
    ActiveSession, ExerciseStatusUpdate, NewActiveSession, UserLevel, WorkoutTemplate,
};
use crate::notifications::{Notification, Notifier};
use crate::recovery::ReconcileTarget;
use crate::utils::retry::timeout_error;

/// Releases the start-in-flight flag when a `start()` call ends
struct StartGuard<'a>(&'a AtomicBool);

impl<'a> StartGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates one user's active workout
pub struct SessionController {
    stores: SessionStores,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    current: RwLock<Option<ActiveSession>>,
    starting: AtomicBool,
    // Serializes mutations, complete and cancel against each other
    write_lock: Mutex<()>,
    // Plan of a completion whose history record is durable but whose XP is not
    settling: Mutex<Option<SettlementPlan>>,
}

impl SessionController {
    /// Create a controller with no session loaded
    #[must_use]
    pub fn new(
        stores: SessionStores,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
        config: SessionConfig,
    ) -> Self {
        Self {
            stores,
            auth,
            notifier,
            config,
            current: RwLock::new(None),
            starting: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            settling: Mutex::new(None),
        }
    }

    /// Copy of the session held in memory
    pub async fn current_session(&self) -> Option<ActiveSession> {
        self.current.read().await.clone()
    }

    /// Whether a session is held in memory
    pub async fn has_active_session(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Session configuration in use
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn set_current(&self, session: Option<ActiveSession>) {
        *self.current.write().await = session;
    }

    /// Replace the in-memory copy only if it still refers to the same session
    async fn replace_if_current(&self, session: ActiveSession) -> bool {
        let mut guard = self.current.write().await;
        if guard.as_ref().is_some_and(|held| held.id == session.id) {
            *guard = Some(session);
            true
        } else {
            false
        }
    }

    async fn clear_if_current(&self, session_id: Uuid) {
        let mut guard = self.current.write().await;
        if guard.as_ref().is_some_and(|held| held.id == session_id) {
            *guard = None;
        }
    }

    /// The held session, provided it belongs to the signed-in user
    ///
    /// Without a user no session is possible, and a session held for another
    /// user is stale; both drop local state.
    async fn owned_session(&self, operation: &'static str) -> Option<ActiveSession> {
        let Some(user_id) = self.auth.current_user_id() else {
            if self.current.write().await.take().is_some() {
                info!(operation, "Signed out, dropping local session");
            }
            *self.settling.lock().await = None;
            return None;
        };
        let session = self.current_session().await?;
        if session.user_id != user_id {
            warn!(
                operation,
                session.id = %session.id,
                user.id = %user_id,
                "Held session belongs to another user, dropping it"
            );
            self.clear_if_current(session.id).await;
            return None;
        }
        Some(session)
    }

    async fn settling_plan(&self, session_id: Uuid) -> Option<SettlementPlan> {
        self.settling
            .lock()
            .await
            .as_ref()
            .filter(|plan| plan.record.session_id == session_id)
            .cloned()
    }

    /// Start a workout from a template
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` without a signed-in user, `SessionAlreadyActive`
    /// if a session exists in memory or in the store, and a store error if the
    /// initial persist fails after retries
    #[instrument(skip(self, template), fields(template.id = %template.id))]
    pub async fn start(&self, template: &WorkoutTemplate) -> AppResult<ActiveSession> {
        let user_id = self.auth.current_user_id().ok_or_else(AppError::auth_required)?;

        let Some(_guard) = StartGuard::acquire(&self.starting) else {
            return Err(self.reject_start(None));
        };
        if let Some(existing) = self.current_session().await {
            return Err(self.reject_start(Some(existing.id)));
        }
        if let Some(existing_id) = self.find_persisted_session(user_id).await {
            return Err(self.reject_start(Some(existing_id)));
        }

        let previous_weights = self.previous_weights(user_id, template).await;
        let new_session = NewActiveSession::from_template(template, &previous_weights, Utc::now());

        let sessions = &self.stores.sessions;
        let draft = &new_session;
        let persisted = self
            .config
            .write_retry
            .run("start.persist", move || async move {
                // Defensive: no incomplete row may survive a successful start
                let removed = sessions.delete_incomplete_for_user(user_id).await?;
                if removed > 0 {
                    warn!(user.id = %user_id, removed, "Cleared stale incomplete sessions before start");
                }
                Ok::<_, AppError>(sessions.insert(user_id, draft).await?)
            })
            .await;

        let session_id = match persisted {
            Ok(id) => id,
            Err(e) => {
                self.notifier.notify(Notification::failure(
                    "Could not start workout",
                    format!("{} could not be saved, please try again", template.name),
                ));
                return Err(e.with_user_id(user_id));
            }
        };

        let session = match self.stores.sessions.get_active(user_id).await {
            Ok(Some(stored)) if stored.id == session_id => stored,
            Ok(Some(other)) => {
                warn!(
                    user.id = %user_id,
                    session.id = %session_id,
                    other.id = %other.id,
                    "Another client started a session concurrently, keeping ours"
                );
                new_session.into_session(session_id, user_id)
            }
            Ok(None) => new_session.into_session(session_id, user_id),
            Err(e) => {
                warn!(session.id = %session_id, error = %e, "Reload after start failed, using local copy");
                new_session.into_session(session_id, user_id)
            }
        };

        self.set_current(Some(session.clone())).await;
        SessionLogger::log_session_started(
            user_id,
            session.id,
            &session.template_id,
            session.exercises.len(),
        );
        self.notifier.notify(Notification::success(
            "Workout started",
            format!("{} is underway", session.template_name),
        ));
        Ok(session)
    }

    fn reject_start(&self, session_id: Option<Uuid>) -> AppError {
        self.notifier.notify(Notification::failure(
            "Workout already in progress",
            "Resume or cancel the current workout before starting a new one",
        ));
        SessionError::AlreadyActive { session_id }.into()
    }

    /// Best-effort lookup; a failed or slow check lets the start proceed
    async fn find_persisted_session(&self, user_id: Uuid) -> Option<Uuid> {
        let budget = self.config.existing_session_check_timeout;
        match timeout(budget, self.stores.sessions.get_active(user_id)).await {
            Ok(Ok(existing)) => existing.map(|session| session.id),
            Ok(Err(e)) => {
                warn!(user.id = %user_id, error = %e, "Existing-session check failed, proceeding");
                None
            }
            Err(_) => {
                let error = timeout_error("existing-session check", budget);
                warn!(user.id = %user_id, error = %error, "Existing-session check timed out, proceeding");
                None
            }
        }
    }

    async fn previous_weights(
        &self,
        user_id: Uuid,
        template: &WorkoutTemplate,
    ) -> HashMap<String, f64> {
        let lookups = template.exercises.iter().map(|exercise| async move {
            let weight = match self
                .stores
                .weights
                .latest_weight(user_id, &exercise.id)
                .await
            {
                Ok(weight) => weight,
                Err(e) => {
                    debug!(exercise.id = %exercise.id, error = %e, "Previous weight unavailable");
                    None
                }
            };
            (exercise.id.clone(), weight)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(exercise_id, weight)| weight.map(|w| (exercise_id, w)))
            .collect()
    }

    /// Apply a change to a copy of the current session, persist it, then swap it in
    async fn mutate<F>(&self, operation: &'static str, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut ActiveSession) -> Result<(), SessionError>,
    {
        let _write = self.write_lock.lock().await;
        let Some(mut session) = self.owned_session(operation).await else {
            debug!(operation, "No active session, ignoring");
            return Ok(());
        };
        if self.settling_plan(session.id).await.is_some() {
            return Err(SessionError::SettlementPending {
                session_id: session.id,
            }
            .into());
        }

        apply(&mut session).map_err(|e| AppError::from(e).with_resource_id(session.id.to_string()))?;
        self.stores
            .sessions
            .update(&session)
            .await
            .map_err(|e| AppError::from(e).with_user_id(session.user_id))?;

        let session_id = session.id;
        if !self.replace_if_current(session).await {
            debug!(operation, session.id = %session_id, "Session replaced during write, dropping local copy");
        }
        Ok(())
    }

    /// Merge a partial update into one exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown, the update is invalid, or the write fails
    pub async fn update_exercise_status(
        &self,
        exercise_id: &str,
        update: ExerciseStatusUpdate,
    ) -> AppResult<()> {
        self.mutate("update_exercise_status", |session| {
            session.update_exercise_status(exercise_id, update)
        })
        .await
    }

    /// Replace one exercise's notes
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown or the write fails
    pub async fn update_exercise_notes(&self, exercise_id: &str, notes: &str) -> AppResult<()> {
        self.mutate("update_exercise_notes", |session| {
            session.update_exercise_notes(exercise_id, notes)
        })
        .await
    }

    /// Replace the workout notes
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn update_workout_notes(&self, notes: &str) -> AppResult<()> {
        self.mutate("update_workout_notes", |session| {
            session.update_notes(notes);
            Ok(())
        })
        .await
    }

    /// Append a blank set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise is unknown or the write fails
    pub async fn add_set(&self, exercise_id: &str) -> AppResult<()> {
        self.mutate("add_set", |session| session.add_set(exercise_id).map(|_| ()))
            .await
    }

    /// Remove a set and renumber the rest
    ///
    /// # Errors
    ///
    /// Returns an error for the last remaining set, an unknown exercise or index, or a failed write
    pub async fn remove_set(&self, exercise_id: &str, index: usize) -> AppResult<()> {
        self.mutate("remove_set", |session| session.remove_set(exercise_id, index))
            .await
    }

    /// Set the reps of one set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown or the write fails
    pub async fn set_reps(&self, exercise_id: &str, index: usize, reps: u32) -> AppResult<()> {
        self.mutate("set_reps", |session| session.set_reps(exercise_id, index, reps))
            .await
    }

    /// Set the weight of one set
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite weights, unknown exercise or index, or a failed write
    pub async fn set_weight(&self, exercise_id: &str, index: usize, weight: f64) -> AppResult<()> {
        self.mutate("set_weight", |session| {
            session.set_weight(exercise_id, index, weight)
        })
        .await
    }

    /// Tick or untick one set
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or index is unknown or the write fails
    pub async fn set_completed(
        &self,
        exercise_id: &str,
        index: usize,
        completed: bool,
    ) -> AppResult<()> {
        self.mutate("set_completed", |session| {
            session.set_completed(exercise_id, index, completed)
        })
        .await
    }

    /// Acknowledge a pause; progress is already saved so nothing is written
    pub async fn pause(&self) -> bool {
        let active = self.owned_session("pause").await.is_some();
        if active {
            self.notifier.notify(Notification::info(
                "Workout paused",
                "Your progress is saved, resume any time",
            ));
        }
        active
    }

    /// Settle the current session: history, XP, ledger rollovers
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` when nothing is held, or the store error if the
    /// history append or XP increment fails; the session stays active in that case.
    ///
    /// Once the history record is written the session is frozen: a retry settles
    /// the same snapshot and edits are rejected with `SettlementPending`.
    #[instrument(skip(self))]
    pub async fn complete(&self) -> AppResult<CompletionSummary> {
        let _write = self.write_lock.lock().await;
        let Some(session) = self.owned_session("complete").await else {
            return Err(SessionError::NoActiveSession.into());
        };
        let user_id = session.user_id;
        let plan = self
            .settling_plan(session.id)
            .await
            .unwrap_or_else(|| SettlementPlan::for_session(&session, Utc::now()));
        let retry = self.config.write_retry;

        let history = &self.stores.history;
        let record = &plan.record;
        let history_id = match retry
            .run("complete.history", move || async move {
                Ok::<_, AppError>(history.append(record).await?)
            })
            .await
        {
            Ok(id) => id,
            Err(e) => return Err(self.fail_completion(e, user_id)),
        };
        *self.settling.lock().await = Some(plan.clone());

        let profiles = &self.stores.profiles;
        let xp_earned = plan.xp_earned;
        let total_xp = match retry
            .run("complete.xp", move || async move {
                Ok::<_, AppError>(profiles.increment_xp(user_id, xp_earned).await?)
            })
            .await
        {
            Ok(total) => total,
            Err(e) => return Err(self.fail_completion(e, user_id)),
        };

        let mut weight_updates = Vec::with_capacity(plan.weight_updates.len());
        for update in plan.weight_updates {
            match self
                .stores
                .weights
                .record_latest(user_id, &update.exercise_id, update.weight)
                .await
            {
                Ok(_) => weight_updates.push(update),
                Err(e) => warn!(
                    user.id = %user_id,
                    exercise.id = %update.exercise_id,
                    error = %e,
                    "Weight ledger rollover failed"
                ),
            }
        }

        *self.settling.lock().await = None;
        if let Err(e) = self.stores.sessions.mark_completed(session.id).await {
            SessionLogger::log_degraded_write("mark_completed", Some(session.id), &e);
        }
        self.clear_if_current(session.id).await;

        let previous_level = UserLevel::from_xp(total_xp.saturating_sub(u64::from(xp_earned)));
        let level = UserLevel::from_xp(total_xp);
        let summary = CompletionSummary {
            session_id: session.id,
            history_id,
            xp_earned,
            total_xp,
            level,
            leveled_up: level.level > previous_level.level,
            weight_updates,
            duration_secs: plan.record.duration_secs,
        };

        SessionLogger::log_session_completed(
            user_id,
            session.id,
            xp_earned,
            summary.weight_updates.len(),
            summary.duration_secs,
        );
        let message = if summary.leveled_up {
            format!("+{xp_earned} XP, you reached level {}", level.level)
        } else {
            format!("+{xp_earned} XP")
        };
        self.notifier
            .notify(Notification::success("Workout complete", message));
        Ok(summary)
    }

    fn fail_completion(&self, error: AppError, user_id: Uuid) -> AppError {
        warn!(user.id = %user_id, error = %error, "Workout completion failed, session stays active");
        self.notifier.notify(Notification::failure(
            "Could not complete workout",
            "Your workout is still active, please try again",
        ));
        error.with_user_id(user_id)
    }

    /// Discard the current session without producing history
    ///
    /// Returns `false` when nothing was active. A failed or slow store delete is
    /// logged and local state is cleared anyway.
    ///
    /// # Errors
    ///
    /// Store failures are logged rather than returned
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> AppResult<bool> {
        let _write = self.write_lock.lock().await;
        let Some(session) = self.owned_session("cancel").await else {
            return Ok(false);
        };
        *self.settling.lock().await = None;

        let budget = self.config.cancel_delete_timeout;
        let deleted = match timeout(budget, self.stores.sessions.delete(session.id)).await {
            Ok(Ok(deleted)) => deleted,
            Ok(Err(e)) => {
                SessionLogger::log_degraded_write("cancel.delete", Some(session.id), &e);
                false
            }
            Err(_) => {
                let error = timeout_error("cancel delete", budget);
                SessionLogger::log_degraded_write("cancel.delete", Some(session.id), &error);
                false
            }
        };

        self.clear_if_current(session.id).await;
        SessionLogger::log_session_cancelled(session.user_id, session.id, deleted);
        self.notifier.notify(Notification::success(
            "Workout cancelled",
            format!("{} was discarded", session.template_name),
        ));
        Ok(true)
    }

    /// Delete every non-completed session of the user except the newest
    ///
    /// Also purges settled rows. Returns the number of orphans removed.
    ///
    /// # Errors
    ///
    /// Returns the store error if listing or deleting fails
    pub async fn cleanup_orphans(&self) -> AppResult<usize> {
        let Some(user_id) = self.auth.current_user_id() else {
            return Ok(0);
        };

        let sessions = self.stores.sessions.list_by_user(user_id).await?;
        let mut removed = 0;
        for orphan in sessions.iter().skip(1) {
            if self.stores.sessions.delete(orphan.id).await? {
                removed += 1;
            }
        }

        match self.stores.sessions.purge_completed(user_id).await {
            Ok(purged) if purged > 0 => debug!(user.id = %user_id, purged, "Purged settled sessions"),
            Ok(_) => {}
            Err(e) => SessionLogger::log_degraded_write("purge_completed", None, &e),
        }

        SessionLogger::log_orphans_removed(user_id, removed);
        Ok(removed)
    }

    /// Re-derive the current session from the store, overwriting local state
    ///
    /// Malformed documents count as "no session". On any other failure local
    /// state is cleared as well, so stale data is never shown as fresh.
    ///
    /// # Errors
    ///
    /// Returns the store error so callers can retry
    pub async fn reload(&self) -> AppResult<Option<ActiveSession>> {
        let Some(user_id) = self.auth.current_user_id() else {
            self.set_current(None).await;
            return Ok(None);
        };

        if let Err(e) = self.cleanup_orphans().await {
            warn!(user.id = %user_id, error = %e, "Orphan cleanup failed, loading anyway");
        }

        match self.stores.sessions.get_active(user_id).await {
            Ok(session) => {
                self.set_current(session.clone()).await;
                Ok(session)
            }
            Err(DatabaseError::DataShapeMismatch { entity_type, details }) => {
                warn!(user.id = %user_id, entity_type, details = %details, "Ignoring malformed session document");
                self.set_current(None).await;
                Ok(None)
            }
            Err(e) => {
                self.set_current(None).await;
                Err(AppError::from(e).with_user_id(user_id))
            }
        }
    }

    /// Cleanup then load, for app start; failures are logged and yield `None`
    pub async fn load_active_session(&self) -> Option<ActiveSession> {
        match self.reload().await {
            Ok(session) => {
                info!(found = session.is_some(), "Active session loaded");
                session
            }
            Err(e) => {
                warn!(error = %e, "Active session load failed, treating as none");
                None
            }
        }
    }
}

#[async_trait]
impl ReconcileTarget for SessionController {
    async fn reconcile(&self) -> AppResult<Option<ActiveSession>> {
        self.reload().await
    }

    async fn discard_local(&self) {
        self.set_current(None).await;
    }
}
