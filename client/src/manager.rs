//! Sign-in, refresh, and sign-out flows over the store and the bridge.
//!
//! DESIGN
//! ======
//! `SessionManager` is built once by the composition root and passed by
//! reference to the few call sites that change who is signed in. Each flow
//! replaces the stored value wholesale, then mirrors it through the bridge.
//! Sign-out clears the cookie mirror even when the stored value could not be
//! removed from persistence, so protected routes close either way.

use std::sync::Arc;

use session::{AuthState, TokenGrant};
use time::OffsetDateTime;

use crate::net::api::{ApiError, AuthApi};
use crate::net::bridge::CookieBridge;
use crate::net::transport::{BridgeError, CookieTransport};
use crate::state::auth::AuthStore;
use crate::state::identity::{Identity, IdentityProjector};

/// Errors surfaced by session flows.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no refresh token held")]
    NoRefreshToken,
}

/// Owner of the auth store, identity projector, and cookie bridge.
pub struct SessionManager<T: CookieTransport> {
    store: AuthStore,
    projector: IdentityProjector,
    bridge: CookieBridge<T>,
}

impl<T: CookieTransport> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<T: CookieTransport> SessionManager<T> {
    #[must_use]
    pub fn new(store: AuthStore, bridge: CookieBridge<T>) -> Self {
        Self { store, projector: IdentityProjector::new(), bridge }
    }

    #[must_use]
    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    #[must_use]
    pub fn bridge(&self) -> &CookieBridge<T> {
        &self.bridge
    }

    /// Identity for the current auth state, stable across unchanged state.
    #[must_use]
    pub fn identity(&self) -> Arc<Identity> {
        self.projector.project(&self.store.get())
    }

    /// Restore a persisted session and re-mirror it into cookies.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bridge`] if the restored session could not be
    /// mirrored. The store keeps the restored value regardless.
    pub async fn rehydrate(&self) -> Result<Arc<Identity>, SessionError> {
        let state = self.store.rehydrate();
        if !state.is_empty() {
            self.bridge.synchronize(state.payload()).await?;
        }
        Ok(self.identity())
    }

    /// Install the grant returned by a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bridge`] if the cookies could not be set; a
    /// later call with the same token retries.
    pub async fn sign_in(&self, grant: TokenGrant) -> Result<Arc<Identity>, SessionError> {
        self.install(grant, "signed in").await
    }

    /// Install the grant returned by a successful token refresh.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bridge`] if the cookies could not be updated.
    pub async fn apply_refresh(&self, grant: TokenGrant) -> Result<Arc<Identity>, SessionError> {
        self.install(grant, "token refreshed").await
    }

    /// Treat the session as unrecoverable after a refresh was refused.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bridge`] if the cookie clearing request failed.
    pub async fn refresh_failed(&self) -> Result<(), SessionError> {
        tracing::info!("refresh refused; signing out");
        self.sign_out().await
    }

    /// Clear the stored session and the cookie mirror.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bridge`] if the clearing request failed. The
    /// store and the local cookie copy are cleared regardless.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.store.clear();
        self.bridge.revoke().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Sign in against the backend with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] if the backend refuses or is unreachable
    /// and [`SessionError::Bridge`] if the cookies could not be set.
    pub async fn sign_in_with(&self, api: &AuthApi, email: &str, password: &str) -> Result<Arc<Identity>, SessionError> {
        let grant = api.sign_in(email, password).await?;
        self.sign_in(grant).await
    }

    /// Refresh the session against the backend using the held refresh token.
    ///
    /// A refused refresh signs the session out; a transport failure leaves
    /// the session untouched so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoRefreshToken`] when nothing can be refreshed
    /// and the underlying [`SessionError::Api`] otherwise.
    pub async fn refresh_with(&self, api: &AuthApi) -> Result<Arc<Identity>, SessionError> {
        let Some(refresh_token) = self.store.get().refresh_token else {
            return Err(SessionError::NoRefreshToken);
        };

        match api.refresh(&refresh_token).await {
            Ok(grant) => self.apply_refresh(grant).await,
            Err(e) if e.is_rejection() => {
                if let Err(sign_out) = self.refresh_failed().await {
                    tracing::warn!(error = %sign_out, "sign-out after refused refresh incomplete");
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn install(&self, grant: TokenGrant, event: &'static str) -> Result<Arc<Identity>, SessionError> {
        let state = AuthState::from_grant(grant, OffsetDateTime::now_utc());
        let payload = state.payload();
        self.store.set(state);
        tracing::info!(event, "session updated");

        self.bridge.synchronize(payload).await?;
        Ok(self.identity())
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
