//! Loopback HTTP backend for exercising the real `reqwest` clients.
//!
//! Serves the cookie bridge endpoint plus the sign-in and refresh endpoints
//! on `127.0.0.1:0`. Behavior is steered through [`StubControls`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use session::SessionPayload;
use session::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, ROLE_COOKIE, SESSION_BRIDGE_PATH, SESSION_COOKIES};

use super::api::{LOGIN_PATH, REFRESH_PATH};

pub const PASSWORD: &str = "correct horse";
pub const GOOD_REFRESH: &str = "refresh-ok";
pub const ISSUED_TOKEN: &str = "issued.access.token";

#[derive(Default)]
pub struct StubControls {
    /// Status the bridge endpoint answers with; 0 means success.
    bridge_status: AtomicU16,
    /// Answer sign-in with a body that is not a grant.
    garble_grants: AtomicBool,
    pub bridge_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

pub struct StubBackend {
    addr: SocketAddr,
    pub controls: Arc<StubControls>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let controls = Arc::new(StubControls::default());
        let app = Router::new()
            .route(SESSION_BRIDGE_PATH, post(set_session).delete(clear_session))
            .route(LOGIN_PATH, post(login))
            .route(REFRESH_PATH, post(refresh))
            .with_state(Arc::clone(&controls));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, controls }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn fail_bridge_with(&self, status: u16) {
        self.controls.bridge_status.store(status, Ordering::SeqCst);
    }

    pub fn garble_grants(&self) {
        self.controls.garble_grants.store(true, Ordering::SeqCst);
    }
}

/// Base URL of a loopback port nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn bridge_failure(controls: &StubControls) -> Option<Response> {
    controls.bridge_calls.fetch_add(1, Ordering::SeqCst);
    match controls.bridge_status.load(Ordering::SeqCst) {
        0 => None,
        status => Some(StatusCode::from_u16(status).unwrap().into_response()),
    }
}

fn with_cookies(cookies: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        headers.append(header::SET_COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    headers
}

async fn set_session(State(controls): State<Arc<StubControls>>, Json(payload): Json<SessionPayload>) -> Response {
    if let Some(failure) = bridge_failure(&controls) {
        return failure;
    }
    let mut cookies = Vec::new();
    if let Some(token) = payload.access_token {
        cookies.push(format!("{ACCESS_TOKEN_COOKIE}={token}; Path=/; HttpOnly"));
    }
    if let Some(token) = payload.refresh_token {
        cookies.push(format!("{REFRESH_TOKEN_COOKIE}={token}; Path=/; HttpOnly"));
    }
    if let Some(role) = payload.role {
        cookies.push(format!("{ROLE_COOKIE}={role}; Path=/"));
    }
    (with_cookies(&cookies), Json(json!({ "ok": true }))).into_response()
}

async fn clear_session(State(controls): State<Arc<StubControls>>) -> Response {
    if let Some(failure) = bridge_failure(&controls) {
        return failure;
    }
    let cookies: Vec<String> = SESSION_COOKIES
        .iter()
        .map(|name| format!("{name}=; Path=/; Max-Age=0"))
        .collect();
    (with_cookies(&cookies), Json(json!({ "ok": true }))).into_response()
}

fn grant(controls: &StubControls) -> Json<Value> {
    if controls.garble_grants.load(Ordering::SeqCst) {
        return Json(json!({ "unexpected": true }));
    }
    Json(json!({
        "accessToken": ISSUED_TOKEN,
        "accessTokenExpiresAtUtc": "2099-01-01T00:00:00Z",
        "refreshToken": GOOD_REFRESH,
        "role": "SHOPPER",
        "sessionId": 7,
    }))
}

async fn login(State(controls): State<Arc<StubControls>>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    grant(&controls).into_response()
}

async fn refresh(State(controls): State<Arc<StubControls>>, Json(body): Json<Value>) -> Response {
    controls.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if body["refreshToken"] != GOOD_REFRESH {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    grant(&controls).into_response()
}
