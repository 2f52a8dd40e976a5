//! Process-wide credential cache for the current browsing session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The rendering layer reads identity from here; the cookie bridge mirrors it
//! for the edge interceptor. Only the sign-in, refresh, and sign-out flows in
//! [`crate::manager`] write to it, and every write replaces the whole value.
//!
//! ERROR HANDLING
//! ==============
//! Persistence is best-effort. A failed write never blocks the in-memory
//! change, and an unreadable or corrupt mirror rehydrates as signed out.

use std::sync::{PoisonError, RwLock};

use session::AuthState;
use time::OffsetDateTime;

use super::persistence::{self, MemoryPersistence, StatePersistence};

/// Credential cache with a persisted mirror.
pub struct AuthStore {
    current: RwLock<AuthState>,
    persistence: Box<dyn StatePersistence>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("is_authenticated", &self.get().is_authenticated)
            .finish_non_exhaustive()
    }
}

impl AuthStore {
    /// Empty store writing through `persistence`. Call [`Self::rehydrate`] to
    /// pick up a previous session.
    #[must_use]
    pub fn new(persistence: impl StatePersistence + 'static) -> Self {
        Self { current: RwLock::new(AuthState::empty()), persistence: Box::new(persistence) }
    }

    /// Store whose mirror lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryPersistence::new())
    }

    /// Current in-memory value. Never touches storage.
    #[must_use]
    pub fn get(&self) -> AuthState {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the in-memory value and write the mirror.
    ///
    /// The write lock is held across the mirror write so a concurrent
    /// [`Self::clear`] cannot leave memory and mirror disagreeing.
    pub fn set(&self, value: AuthState) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let persisted = persistence::save_json(self.persistence.as_ref(), &value);
        *current = value;
        drop(current);

        if let Err(e) = persisted {
            tracing::warn!(error = %e, "auth state mirror write failed");
        }
    }

    /// Reset to the signed-out state and delete the mirror.
    pub fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = AuthState::empty();
        let removed = self.persistence.remove();
        drop(current);

        if let Err(e) = removed {
            tracing::warn!(error = %e, "auth state mirror removal failed");
        }
    }

    /// Load the persisted mirror into memory and return the resulting value.
    pub fn rehydrate(&self) -> AuthState {
        self.rehydrate_at(OffsetDateTime::now_utc())
    }

    pub(crate) fn rehydrate_at(&self, now: OffsetDateTime) -> AuthState {
        let restored = match persistence::load_json::<AuthState>(self.persistence.as_ref()) {
            Ok(Some(state)) if state.is_consistent() => state.revalidated(now),
            Ok(Some(_)) => {
                tracing::warn!("persisted auth state violates invariants; treating as signed out");
                self.discard_mirror();
                AuthState::empty()
            }
            Ok(None) => AuthState::empty(),
            Err(e) => {
                tracing::warn!(error = %e, "persisted auth state unreadable; treating as signed out");
                if matches!(e, persistence::PersistError::Decode(_)) {
                    self.discard_mirror();
                }
                AuthState::empty()
            }
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = restored.clone();
        tracing::debug!(is_authenticated = restored.is_authenticated, "auth state rehydrated");
        restored
    }

    fn discard_mirror(&self) {
        if let Err(e) = self.persistence.remove() {
            tracing::warn!(error = %e, "corrupt auth state mirror could not be removed");
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
