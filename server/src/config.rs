//! Server configuration parsed from environment variables.
//!
//! - `PORT`: listen port, default 3000
//! - `APP_ENV`: `development` turns off the `Secure` cookie attribute
//! - `COOKIE_SECURE`: explicit override for the `Secure` attribute
//! - `STATIC_DIR`: directory the rendered pages are served from
//! - `GUARD_ALLOW_PENDING_REFRESH`: let navigations through while only a
//!   refresh-token cookie is present, default on

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

/// Route interceptor behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// Treat "refresh cookie without access cookie" as a refresh in flight
    /// and allow the navigation.
    pub allow_pending_refresh: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { allow_pending_refresh: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
    pub guard: GuardConfig,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if `PORT` is set but not a port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR));
        let guard = GuardConfig {
            allow_pending_refresh: env_bool("GUARD_ALLOW_PENDING_REFRESH").unwrap_or(true),
        };

        Ok(Self { port, cookie_secure: cookie_secure(), static_dir, guard })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// `Secure` is on unless running under local development.
pub(crate) fn cookie_secure() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }

    secure_for_env(std::env::var("APP_ENV").ok().as_deref())
}

fn secure_for_env(app_env: Option<&str>) -> bool {
    !matches!(
        app_env.map(|raw| raw.trim().to_ascii_lowercase()).as_deref(),
        Some("development" | "dev" | "local")
    )
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
