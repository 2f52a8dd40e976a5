//! Route interceptor.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs before any page renders. Presence of the access-token cookie means
//! "authenticated"; the role cookie supplies the role. Nothing is decoded or
//! verified here, the backend remains the authority for data access.
//!
//! TRADE-OFFS
//! ==========
//! With the refresh-pending allowance on, a navigation that arrives while
//! only the refresh-token cookie is present goes through unchecked. The page
//! may then render with the role of the *previous* access token until the
//! client finishes refreshing and re-mirrors the cookies.

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use session::Role;
use session::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, ROLE_COOKIE};
use session::policy::{self, AccessVerdict, SIGN_IN_PATH};

use crate::config::GuardConfig;
use crate::state::AppState;

/// Query parameter carrying the originally requested location.
pub const RETURN_PARAM: &str = "returnUrl";

/// What the interceptor can learn from request cookies alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSession {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub role: Option<Role>,
}

impl CookieSession {
    #[must_use]
    pub fn from_jar(jar: &CookieJar) -> Self {
        let present = |name: &str| jar.get(name).map(Cookie::value).is_some_and(|v| !v.is_empty());

        Self {
            has_access_token: present(ACCESS_TOKEN_COOKIE),
            has_refresh_token: present(REFRESH_TOKEN_COOKIE),
            role: jar.get(ROLE_COOKIE).and_then(|c| c.value().parse().ok()),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.has_access_token
    }

    /// Access token gone, refresh token still around: a refresh is likely
    /// in progress on the client.
    #[must_use]
    pub fn refresh_pending(&self) -> bool {
        !self.has_access_token && self.has_refresh_token
    }
}

/// Outcome of one interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(String),
}

/// The path the static file service will resolve `raw` to.
///
/// Decodes percent escapes before splitting into segments. A `..` segment
/// never climbs above the root.
#[must_use]
pub fn canonical_path(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Decide what to do with a navigation to `uri`.
///
/// Zones are judged on [`canonical_path`], never on the raw request path.
#[must_use]
pub fn evaluate(uri: &Uri, session: &CookieSession, config: GuardConfig) -> GuardDecision {
    let canonical = canonical_path(uri.path());
    let path = canonical.as_str();
    if !policy::is_protected(path) {
        return GuardDecision::Pass;
    }

    if config.allow_pending_refresh && session.refresh_pending() {
        tracing::debug!(%path, "refresh pending; letting navigation through");
        return GuardDecision::Pass;
    }

    match policy::decide(path, session.is_authenticated(), session.role) {
        AccessVerdict::Allow => GuardDecision::Pass,
        AccessVerdict::RedirectTo(target) if target == SIGN_IN_PATH => {
            GuardDecision::Redirect(sign_in_location(uri))
        }
        AccessVerdict::RedirectTo(target) => GuardDecision::Redirect(target),
    }
}

fn sign_in_location(uri: &Uri) -> String {
    let requested = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(RETURN_PARAM, requested)
        .finish();
    format!("{SIGN_IN_PATH}?{query}")
}

/// Axum middleware wrapping the page router.
pub async fn guard(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    let session = CookieSession::from_jar(&jar);
    match evaluate(request.uri(), &session, state.guard) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Redirect(location) => {
            tracing::info!(path = %request.uri().path(), %location, "navigation redirected");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
