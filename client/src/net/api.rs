//! REST calls to the backend that issues tokens.
//!
//! ERROR HANDLING
//! ==============
//! Every failure comes back as an [`ApiError`]; callers decide whether a
//! rejection is irrecoverable (see [`ApiError::is_rejection`]).

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use session::TokenGrant;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh-token";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 15;

/// Errors produced by backend auth calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("api configuration invalid: {0}")]
    Config(String),
    #[error("api request failed: {0}")]
    Request(String),
    #[error("api responded with status {status}")]
    Status { status: u16 },
    #[error("api response parse failed: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether the backend refused the credentials outright.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status: 400 | 401 | 403 })
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Client for the backend's sign-in and refresh endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: reqwest::Client,
    base_url: Url,
}

impl AuthApi {
    /// Build a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Config(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Exchange credentials for a token grant via `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails, is rejected, or the
    /// response is not a grant.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        self.post_for_grant(LOGIN_PATH, &SignInRequest { email, password })
            .await
    }

    /// Exchange a refresh token for a new grant via `POST /api/auth/refresh-token`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails, is rejected, or the
    /// response is not a grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        self.post_for_grant(REFRESH_PATH, &RefreshRequest { refresh_token })
            .await
    }

    async fn post_for_grant<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<TokenGrant, ApiError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16() });
        }
        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
