//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the route interceptor via
//! the `State` extractor. It is plain configuration: the server keeps no
//! per-session data, every request is judged on its own cookies.

use crate::config::{GuardConfig, ServerConfig};

/// Attributes applied to every session cookie the bridge writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    pub cookies: CookieSettings,
    pub guard: GuardConfig,
}

impl AppState {
    #[must_use]
    pub fn new(cookies: CookieSettings, guard: GuardConfig) -> Self {
        Self { cookies, guard }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(CookieSettings { secure: config.cookie_secure }, config.guard)
    }
}
