// ABOUTME: Authentication collaborator consumed by the session controller and recovery layer
// ABOUTME: Exposes the current user id and a credential refresh used by recovery passes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authentication
//!
//! The engine does not manage credentials. It asks an [`AuthProvider`] who the
//! current user is, and asks it to re-verify the credential before a recovery
//! pass. No user id means every session operation is a no-op.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Source of the signed-in user
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Signed-in user, if any
    fn current_user_id(&self) -> Option<Uuid>;

    /// Re-verify the credential with the identity provider
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if the credential can no longer be used
    async fn refresh(&self) -> AppResult<Uuid>;
}

/// Fixed user id with switchable sign-in and expiry state
///
/// Used by the maintenance CLI (which acts on an explicit `--user`) and by tests
/// that need to simulate sign-out or an expired credential.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user_id: RwLock<Option<Uuid>>,
    expired: AtomicBool,
    refreshes: AtomicU64,
}

impl StaticAuthProvider {
    /// Provider signed in as `user_id`
    #[must_use]
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id)),
            ..Self::default()
        }
    }

    /// Provider with nobody signed in
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Switch the signed-in user
    pub fn sign_in(&self, user_id: Uuid) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
        self.expired.store(false, Ordering::SeqCst);
    }

    /// Forget the signed-in user
    pub fn sign_out(&self) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Make the next refresh fail with `AuthExpired`
    pub fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    /// Number of refresh calls so far
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    fn current_user_id(&self) -> Option<Uuid> {
        *self.user_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(&self) -> AppResult<Uuid> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let Some(user_id) = self.current_user_id() else {
            return Err(AppError::auth_required());
        };
        if self.expired.load(Ordering::SeqCst) {
            warn!(user.id = %user_id, "Credential refresh rejected, session expired");
            return Err(AppError::auth_expired().with_user_id(user_id));
        }
        debug!(user.id = %user_id, "Credential refreshed");
        Ok(user_id)
    }
}
