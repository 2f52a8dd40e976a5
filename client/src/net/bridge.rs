//! Session cookie bridge: keeps the cookie mirror in step with the auth store.
//!
//! SYSTEM CONTEXT
//! ==============
//! The edge interceptor cannot see the page's memory; it reads cookies only.
//! This bridge is the one writer of those cookies, via a same-origin endpoint
//! that owns the cookie attributes.
//!
//! ORDERING
//! ========
//! - At most one attempt (synchronize or revoke) is in flight. Late callers
//!   join the in-flight attempt instead of issuing a second request.
//! - A caller joined to an attempt for a *different* token waits for it to
//!   settle and then runs its own synchronize.
//! - Revoke waits for any in-flight synchronize before clearing, so a late
//!   "set" cannot land after a "clear".
//! - The last-synchronized marker advances only on confirmed success and is
//!   reset by revoke. The in-flight handle is released only after the outcome
//!   is recorded.
//!
//! STALENESS
//! =========
//! Until an attempt settles the interceptor may see the previous cookies.
//! That window is one bridge round trip.
//!
//! Attempts run on detached tasks, so a caller that gives up (page teardown)
//! does not abort the request and the cookies still converge.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use session::SessionPayload;
use tokio::sync::Mutex;

use super::transport::{BridgeError, CookieTransport};

type Outcome = Result<(), BridgeError>;
type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptKind {
    Synchronize { access_token: Option<String> },
    Revoke,
}

#[derive(Clone)]
struct Attempt {
    kind: AttemptKind,
    outcome: SharedOutcome,
}

#[derive(Default)]
struct BridgeInner {
    last_synced: Option<String>,
    in_flight: Option<Attempt>,
}

/// Deduplicating, ordered writer of the session cookie set.
pub struct CookieBridge<T: CookieTransport> {
    transport: Arc<T>,
    inner: Arc<Mutex<BridgeInner>>,
}

impl<T: CookieTransport> std::fmt::Debug for CookieBridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieBridge").finish_non_exhaustive()
    }
}

impl<T: CookieTransport> CookieBridge<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport: Arc::new(transport), inner: Arc::new(Mutex::new(BridgeInner::default())) }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Access token of the last confirmed synchronize.
    pub async fn last_synced(&self) -> Option<String> {
        self.inner.lock().await.last_synced.clone()
    }

    /// Whether an attempt is outstanding.
    pub async fn is_in_flight(&self) -> bool {
        self.inner.lock().await.in_flight.is_some()
    }

    /// Mirror `payload` into the session cookies.
    ///
    /// No request is issued when nothing is in flight and the payload's access
    /// token matches the last confirmed synchronize.
    ///
    /// # Errors
    ///
    /// Returns the [`BridgeError`] of the attempt this call issued or joined.
    pub async fn synchronize(&self, payload: SessionPayload) -> Result<(), BridgeError> {
        let token = payload.access_token.clone();
        loop {
            let mut inner = self.inner.lock().await;

            if let Some(attempt) = inner.in_flight.clone() {
                drop(inner);
                let same_token =
                    attempt.kind == AttemptKind::Synchronize { access_token: token.clone() };
                let outcome = attempt.outcome.await;
                if same_token {
                    return outcome;
                }
                continue;
            }

            if token.is_some() && inner.last_synced == token {
                tracing::trace!("session cookies already synchronized");
                return Ok(());
            }

            let outcome = self.start_synchronize(&mut inner, payload);
            drop(inner);
            return outcome.await;
        }
    }

    /// Clear the session cookies.
    ///
    /// Waits for any in-flight synchronize first. Local markers and the local
    /// cookie copy are cleared whether or not the clearing request succeeds.
    ///
    /// # Errors
    ///
    /// Returns the [`BridgeError`] of the clearing request.
    pub async fn revoke(&self) -> Result<(), BridgeError> {
        loop {
            let mut inner = self.inner.lock().await;

            if let Some(attempt) = inner.in_flight.clone() {
                drop(inner);
                let outcome = attempt.outcome.await;
                if attempt.kind == AttemptKind::Revoke {
                    return outcome;
                }
                continue;
            }

            let outcome = self.start_revoke(&mut inner);
            drop(inner);
            return outcome.await;
        }
    }

    fn start_synchronize(&self, inner: &mut BridgeInner, payload: SessionPayload) -> SharedOutcome {
        let access_token = payload.access_token.clone();
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.inner);
        let synced = access_token.clone();

        let task = tokio::spawn(async move {
            let outcome = transport.set_cookies(&payload).await;
            let mut inner = state.lock().await;
            match &outcome {
                Ok(()) => {
                    tracing::debug!("session cookies synchronized");
                    inner.last_synced = synced;
                }
                Err(e) => tracing::warn!(error = %e, "session cookie synchronization failed"),
            }
            inner.in_flight = None;
            outcome
        });

        let outcome = settle(task, Arc::clone(&self.inner));
        inner.in_flight = Some(Attempt {
            kind: AttemptKind::Synchronize { access_token },
            outcome: outcome.clone(),
        });
        outcome
    }

    fn start_revoke(&self, inner: &mut BridgeInner) -> SharedOutcome {
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let outcome = transport.clear_cookies().await;
            transport.discard_local();
            let mut inner = state.lock().await;
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "session cookie revoke request failed; local copy cleared");
            }
            inner.last_synced = None;
            inner.in_flight = None;
            outcome
        });

        let outcome = settle(task, Arc::clone(&self.inner));
        inner.in_flight = Some(Attempt { kind: AttemptKind::Revoke, outcome: outcome.clone() });
        outcome
    }
}

/// Turn a spawned attempt into a joinable outcome.
///
/// A task that dies before recording its outcome still releases the
/// in-flight handle.
fn settle(task: tokio::task::JoinHandle<Outcome>, state: Arc<Mutex<BridgeInner>>) -> SharedOutcome {
    async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "session bridge task failed");
                state.lock().await.in_flight = None;
                Err(BridgeError::Task(e.to_string()))
            }
        }
    }
    .boxed()
    .shared()
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
