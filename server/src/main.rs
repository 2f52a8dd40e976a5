mod config;
mod routes;
mod state;

use config::{ConfigError, ServerConfig};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind: {0}")]
    Bind(std::io::Error),
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    // A missing .env file is the normal case outside local development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "storefront gate exited");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    tracing::info!(
        secure_cookies = config.cookie_secure,
        allow_pending_refresh = config.guard.allow_pending_refresh,
        static_dir = %config.static_dir.display(),
        "configuration loaded"
    );

    let state = state::AppState::from_config(&config);
    let app = routes::app(state, &config.static_dir);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(StartupError::Bind)?;

    tracing::info!(%port, "storefront gate listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}
