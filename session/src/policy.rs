//! UI-level access policy for protected sections of the storefront.
//!
//! DESIGN
//! ======
//! Two zones, each a family of path prefixes. A path belongs to at most one
//! zone; paths outside both are allowed without looking at auth facts.
//! Authentication is checked before role in both zones, so a signed-out
//! visitor is always sent to sign-in rather than to the forbidden page.

use crate::state::Role;

/// Administrative console prefix.
pub const PRIVILEGED_PREFIX: &str = "/admin";
/// Shopper-only prefixes.
pub const SHOPPER_PREFIXES: [&str; 4] = ["/favorites", "/shoplist", "/wishlist", "/cart"];

/// Redirect target for visitors without a session.
pub const SIGN_IN_PATH: &str = "/auth/sign-in";
/// Redirect target for sessions whose role does not fit the zone.
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessVerdict {
    Allow,
    RedirectTo(String),
}

impl AccessVerdict {
    fn redirect(path: &str) -> Self {
        Self::RedirectTo(path.to_owned())
    }

    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Protected zone a path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Privileged,
    Shopper,
}

impl Zone {
    fn admits(self, role: Option<Role>) -> bool {
        match self {
            Self::Privileged => role.is_some_and(Role::is_staff),
            Self::Shopper => role == Some(Role::Shopper),
        }
    }
}

/// Classify `path` by prefix.
#[must_use]
pub fn zone_for(path: &str) -> Option<Zone> {
    if path.starts_with(PRIVILEGED_PREFIX) {
        return Some(Zone::Privileged);
    }
    if SHOPPER_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return Some(Zone::Shopper);
    }
    None
}

/// Whether `path` falls into any protected zone.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    zone_for(path).is_some()
}

/// Decide whether a navigation to `path` may proceed.
#[must_use]
pub fn decide(path: &str, is_authenticated: bool, role: Option<Role>) -> AccessVerdict {
    let Some(zone) = zone_for(path) else {
        return AccessVerdict::Allow;
    };

    if !is_authenticated {
        return AccessVerdict::redirect(SIGN_IN_PATH);
    }
    if !zone.admits(role) {
        return AccessVerdict::redirect(FORBIDDEN_PATH);
    }
    AccessVerdict::Allow
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
