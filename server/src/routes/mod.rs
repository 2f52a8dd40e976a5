//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the session bridge endpoint and the health probe, and
//! serves rendered pages from a static directory as the fallback. Every
//! request passes the route interceptor first, which only acts on paths in
//! a protected zone.

pub mod bridge;
pub mod guard;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use session::cookies::SESSION_BRIDGE_PATH;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState, static_dir: &Path) -> Router {
    let pages = ServeDir::new(static_dir).append_index_html_on_directories(true);

    Router::new()
        .route(SESSION_BRIDGE_PATH, post(bridge::set_session).delete(bridge::clear_session))
        .route("/healthz", get(healthz))
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(state, guard::guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
