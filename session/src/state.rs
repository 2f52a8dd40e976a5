//! Auth state, role, and the payloads that move session facts around.
//!
//! DESIGN
//! ======
//! `AuthState` is replaced wholesale on every sign-in, refresh, and sign-out;
//! no caller mutates a single field of a live value. `SessionPayload` is the
//! subset of that state the cookie mirror needs, with every field optional so
//! the bridge endpoint can accept partial updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::claims;

// =============================================================================
// ROLE
// =============================================================================

/// Role assigned by the identity system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Employee,
    Shopper,
}

impl Role {
    /// Wire and cookie representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Employee => "EMPLOYEE",
            Self::Shopper => "SHOPPER",
        }
    }

    /// Whether the role may enter the administrative console.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Employee)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "EMPLOYEE" => Ok(Self::Employee),
            "SHOPPER" => Ok(Self::Shopper),
            _ => Err(RoleParseError(raw.to_owned())),
        }
    }
}

/// Deserialize an optional role, mapping unknown strings to `None` instead of
/// rejecting the surrounding document.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| value.parse().ok()))
}

// =============================================================================
// TOKEN GRANT
// =============================================================================

/// Token set returned by the backend on sign-in and refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub access_token_expires_at_utc: Option<OffsetDateTime>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub refresh_token_expires_at_utc: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub session_id: Option<i64>,
}

// =============================================================================
// AUTH STATE
// =============================================================================

/// Client-side credential cache for one browsing session.
///
/// Either fully populated (signed in) or fully cleared (signed out).
/// `is_authenticated` implies a non-empty `access_token`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub access_token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub access_token_expires_at_utc: Option<OffsetDateTime>,
    pub refresh_token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub refresh_token_expires_at_utc: Option<OffsetDateTime>,
    pub role: Option<Role>,
    pub session_id: Option<i64>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl AuthState {
    /// The signed-out state.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a signed-in state from a backend grant.
    ///
    /// The grant's role wins; without one the role claim of the access token
    /// is used.
    #[must_use]
    pub fn from_grant(grant: TokenGrant, now: OffsetDateTime) -> Self {
        let role = grant.role.or_else(|| claims::role(Some(&grant.access_token)));
        let refresh_token = grant.refresh_token.filter(|token| !token.is_empty());
        Self {
            access_token: Some(grant.access_token).filter(|token| !token.is_empty()),
            access_token_expires_at_utc: grant.access_token_expires_at_utc,
            refresh_token,
            refresh_token_expires_at_utc: grant.refresh_token_expires_at_utc,
            role,
            session_id: grant.session_id,
            is_authenticated: false,
        }
        .revalidated(now)
    }

    /// Recompute `is_authenticated` against `now`.
    #[must_use]
    pub fn revalidated(mut self, now: OffsetDateTime) -> Self {
        self.is_authenticated = self.access_token_live_at(now);
        self
    }

    /// Whether an access token is present and not known to be expired.
    #[must_use]
    pub fn access_token_live_at(&self, now: OffsetDateTime) -> bool {
        let present = self.access_token.as_deref().is_some_and(|token| !token.is_empty());
        let expired = self
            .access_token_expires_at_utc
            .is_some_and(|expires_at| expires_at <= now);
        present && !expired
    }

    /// Whether the value honors its at-rest invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.is_authenticated {
            return self.access_token.as_deref().is_some_and(|token| !token.is_empty());
        }
        true
    }

    /// Whether no credential of any kind is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// The cookie-mirror view of this state.
    #[must_use]
    pub fn payload(&self) -> SessionPayload {
        SessionPayload {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            role: self.role,
            access_token_expires_at_utc: self.access_token_expires_at_utc,
            refresh_token_expires_at_utc: self.refresh_token_expires_at_utc,
        }
    }
}

// =============================================================================
// SESSION PAYLOAD
// =============================================================================

/// Body of `POST /api/auth/session`.
///
/// Every field defaults to absent. An absent expiry makes the matching cookie
/// a session cookie; an absent token leaves the matching cookie untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token_expires_at_utc: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token_expires_at_utc: Option<OffsetDateTime>,
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
