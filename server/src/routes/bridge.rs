//! Session bridge endpoint.
//!
//! SYSTEM CONTEXT
//! ==============
//! The client's credential store cannot write httpOnly cookies itself, so it
//! posts its session to this same-origin endpoint and the response sets the
//! cookie mirror the route interceptor reads. `DELETE` clears the mirror.
//!
//! ERROR HANDLING
//! ==============
//! Handlers never fail on their own. A malformed body is rejected by the
//! `Json` extractor before the handler runs, so errors reach the client only
//! as a transport status.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use session::SessionPayload;
use session::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, ROLE_COOKIE, SESSION_COOKIES, is_http_only};
use time::{Duration, OffsetDateTime};

use crate::state::AppState;

const NO_STORE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-store")];

/// `POST /api/auth/session`: mirror the posted session into cookies.
///
/// Only fields present in the payload produce a cookie. The role cookie
/// shares the access token's lifetime and is expired when a new access
/// token arrives without a role.
pub async fn set_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SessionPayload>,
) -> impl IntoResponse {
    let secure = state.cookies.secure;
    let access_expiry = payload.access_token_expires_at_utc;
    let mut jar = jar;

    let has_access_token = payload.access_token.as_ref().is_some_and(|t| !t.is_empty());
    if let Some(token) = payload.access_token.filter(|t| !t.is_empty()) {
        jar = jar.add(session_cookie(ACCESS_TOKEN_COOKIE, token, access_expiry, secure));
    }
    if let Some(token) = payload.refresh_token.filter(|t| !t.is_empty()) {
        jar = jar.add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            token,
            payload.refresh_token_expires_at_utc,
            secure,
        ));
    }
    match payload.role {
        Some(role) => {
            jar = jar.add(session_cookie(ROLE_COOKIE, role.as_str().to_owned(), access_expiry, secure));
        }
        // A role left over from the previous access token must not outlive it.
        None if has_access_token => jar = jar.add(expired_cookie(ROLE_COOKIE, secure)),
        None => {}
    }

    tracing::debug!(role = ?payload.role, "session cookies mirrored");
    (jar, NO_STORE, Json(json!({ "ok": true })))
}

/// `DELETE /api/auth/session`: expire every session cookie.
pub async fn clear_session(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let secure = state.cookies.secure;
    let jar = SESSION_COOKIES
        .into_iter()
        .fold(jar, |jar, name| jar.add(expired_cookie(name, secure)));

    tracing::debug!("session cookies cleared");
    (jar, NO_STORE, Json(json!({ "ok": true })))
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(is_http_only(name))
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn session_cookie(
    name: &'static str,
    value: String,
    expires: Option<OffsetDateTime>,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .path("/")
        .http_only(is_http_only(name))
        .same_site(SameSite::Lax)
        .secure(secure);
    if let Some(at) = expires {
        cookie = cookie.expires(at);
    }
    cookie.build()
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
