//! # wible-server
//!
//! HTTP server for the wible wireless environment monitor.
//!
//! This binary provides:
//! - Background Wi-Fi/BLE scanning with rogue access point detection
//! - Periodic internet speed tests
//! - REST API for the latest snapshot, with Swagger UI at `/docs`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package wible-server
//!
//! # Custom configuration
//! WIBLE_CONFIG=./wible.toml ./wible-server
//!
//! # One-off override
//! WIBLE__SCAN__FAST_INTERVAL_SECS=5 ./wible-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use wible_core::{Orchestrator, WibleConfig};
use wible_server::state::AppState;
use wible_server::{api, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WibleConfig::load().context("loading configuration")?;

    logging::init(config.server.production)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting wible-server");
    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(config = %config.to_toml_string()?, "Effective configuration");
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    orchestrator.start().await?;

    let app = api::create_router(AppState::new(Arc::clone(&orchestrator)));

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("binding {}:{}", config.server.host, config.server.port))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, stopping scanner");
    orchestrator.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
