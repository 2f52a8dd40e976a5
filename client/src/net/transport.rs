//! Transport for the same-origin session bridge endpoint.
//!
//! The browser keeps the cookies the bridge sets; here a `reqwest` cookie jar
//! plays that role so the client can run (and be tested) outside a browser.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use session::SessionPayload;
use session::cookies::{SESSION_BRIDGE_PATH, SESSION_COOKIES};

pub const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 10;

/// Errors produced by cookie bridge calls.
///
/// `Clone` so every caller joined to one in-flight attempt receives the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The HTTP client could not be built or the URL is unusable.
    #[error("bridge configuration invalid: {0}")]
    Config(String),
    /// The request did not complete.
    #[error("bridge request failed: {0}")]
    Request(String),
    /// The endpoint answered with a non-success status.
    #[error("bridge responded with status {status}")]
    Status { status: u16 },
    /// The background task driving the request died.
    #[error("bridge task ended unexpectedly: {0}")]
    Task(String),
}

/// Calls that set and clear the session cookie set.
#[async_trait::async_trait]
pub trait CookieTransport: Send + Sync + 'static {
    /// Ask the bridge endpoint to set cookies from `payload`.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the request fails or is rejected.
    async fn set_cookies(&self, payload: &SessionPayload) -> Result<(), BridgeError>;

    /// Ask the bridge endpoint to clear all session cookies.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the request fails or is rejected.
    async fn clear_cookies(&self) -> Result<(), BridgeError>;

    /// Drop any locally held copy of the session cookies.
    fn discard_local(&self);
}

// =============================================================================
// CONFIG
// =============================================================================

/// Where the bridge endpoint lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Origin serving the pages, e.g. `http://localhost:3000`.
    pub origin: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BridgeConfig {
    /// Config for `origin` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `origin` is not an absolute URL.
    pub fn new(origin: &str) -> Result<Self, BridgeError> {
        let origin = Url::parse(origin).map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(Self { origin, timeout: Duration::from_secs(DEFAULT_BRIDGE_TIMEOUT_SECS) })
    }

    /// Absolute URL of the bridge endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the origin cannot be joined.
    pub fn endpoint(&self) -> Result<Url, BridgeError> {
        self.origin
            .join(SESSION_BRIDGE_PATH)
            .map_err(|e| BridgeError::Config(e.to_string()))
    }
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

/// `reqwest` transport with its own cookie jar.
pub struct HttpTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    origin: Url,
    endpoint: Url,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        Ok(Self { client, jar, origin: config.origin.clone(), endpoint: config.endpoint()? })
    }

    /// The `Cookie` header the jar would send to the origin.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    /// Shared handle to the cookie jar, for clients that navigate pages.
    #[must_use]
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(BridgeError::Status { status: status.as_u16() })
}

#[async_trait::async_trait]
impl CookieTransport for HttpTransport {
    async fn set_cookies(&self, payload: &SessionPayload) -> Result<(), BridgeError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| BridgeError::Request(e.to_string()))?;
        check_status(&response)
    }

    async fn clear_cookies(&self) -> Result<(), BridgeError> {
        let response = self
            .client
            .delete(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| BridgeError::Request(e.to_string()))?;
        check_status(&response)
    }

    fn discard_local(&self) {
        for name in SESSION_COOKIES {
            self.jar
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.origin);
        }
    }
}

#[cfg(test)]
#[path = "transport_fake.rs"]
pub(crate) mod test_helpers;

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
