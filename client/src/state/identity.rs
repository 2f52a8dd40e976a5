//! Render-friendly identity derived from the auth state.
//!
//! SYSTEM CONTEXT
//! ==============
//! In-page conditionals (admin-only controls, the account menu) read this.
//! The edge interceptor reaches the same judgment from cookies; both derive
//! from the same sign-in, so they agree once the bridge has synchronized.

use std::sync::{Arc, Mutex, PoisonError};

use session::{AuthState, Role, claims};

/// Who the rendering layer believes is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub is_authenticated: bool,
    pub role: Option<Role>,
    pub username: Option<String>,
}

impl Identity {
    /// Derive an identity from `state`, decoding claims from its access token.
    ///
    /// The token's role claim wins over the stored role.
    #[must_use]
    pub fn project(state: &AuthState) -> Self {
        let token = state.access_token.as_deref();
        Self {
            is_authenticated: state.is_authenticated,
            role: claims::role(token).or(state.role),
            username: claims::username(token),
        }
    }
}

/// Memoizing projector: equal inputs yield the same `Arc`.
#[derive(Debug, Default)]
pub struct IdentityProjector {
    last: Mutex<Option<(AuthState, Arc<Identity>)>>,
}

impl IdentityProjector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `state`, reusing the previous result when `state` is unchanged.
    pub fn project(&self, state: &AuthState) -> Arc<Identity> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((seen, identity)) = last.as_ref() {
            if seen == state {
                return Arc::clone(identity);
            }
        }

        let identity = Arc::new(Identity::project(state));
        *last = Some((state.clone(), Arc::clone(&identity)));
        identity
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
