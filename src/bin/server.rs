//! Rank Tracker HTTP server
//!
//! Serves the OAuth and sync routes. Configuration is read from
//! `RANK_TRACKER_CONFIG` (default `data/config.toml`).

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rank_tracker::{
    api::{AppState, build_router},
    config::Services,
    error::Result,
    models::{Config, LoggingConfig},
};

const DEFAULT_CONFIG_PATH: &str = "data/config.toml";

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let json = logging.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("RANK_TRACKER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let (config, load_error) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let config = config.apply_env();
    init_tracing(&config.logging);

    match load_error {
        Some(e) => warn!(
            path = %config_path.display(),
            error = %e,
            "Config load failed, using defaults"
        ),
        None => info!(path = %config_path.display(), "Loaded configuration"),
    }
    config.validate()?;

    let addr = config.server.bind_addr();
    let services = Services::from_config(config).await?;
    let app = build_router(AppState::from_services(&services));

    let listener = TcpListener::bind(addr.as_str()).await?;
    info!(addr = %addr, "Rank tracker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
