//! Cookie contract between the bridge endpoint and the route interceptor.

/// Access token cookie (httpOnly).
pub const ACCESS_TOKEN_COOKIE: &str = "token";
/// Refresh token cookie (httpOnly).
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
/// Role cookie, readable by page scripts. A UI hint, never an authority.
pub const ROLE_COOKIE: &str = "role";

/// All cookies that make up the mirror, in clearing order.
pub const SESSION_COOKIES: [&str; 3] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, ROLE_COOKIE];

/// Path of the same-origin bridge endpoint.
pub const SESSION_BRIDGE_PATH: &str = "/api/auth/session";

/// Whether page scripts are denied access to `name`.
#[must_use]
pub fn is_http_only(name: &str) -> bool {
    name != ROLE_COOKIE
}
