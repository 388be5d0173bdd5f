//! Arena Server - Authoritative multiplayer arena shooter
//!
//! This is the main entry point for the server. It handles:
//! - The fixed-rate simulation loop
//! - WebSocket connections for inputs and state snapshots
//! - HTTP endpoints for health and arena geometry

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_server::app::AppState;
use arena_server::config::Config;
use arena_server::game::{Arena, GeometryCatalog};
use arena_server::http::build_router;
use arena_server::util::time::{backoff_delay, init_server_time};

const BIND_ATTEMPTS: u32 = 5;
const BIND_BACKOFF_BASE: Duration = Duration::from_millis(250);
const BIND_BACKOFF_MAX: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting Arena Server");
    info!("Server address: {}", config.server_addr);

    let config = Arc::new(config);
    let arena_config = Arc::new(config.arena.clone());
    let catalog = Arc::new(GeometryCatalog::standard(arena_config.half_size));
    info!(
        arena_size = catalog.arena_size,
        boxes = catalog.boxes.len(),
        "Arena geometry loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the simulation loop
    let (arena, handle) = Arena::new(arena_config, catalog.clone());
    let arena_task = tokio::spawn(arena.run(shutdown_rx.clone()));

    let state = AppState::new(config.clone(), handle, catalog, shutdown_rx);
    let router = build_router(state);

    let listener = bind_with_retry(config.server_addr).await?;

    info!("Server listening on {}", config.server_addr);
    info!("Health check: http://{}/health", config.server_addr);
    info!("WebSocket endpoint: ws://{}/ws", config.server_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stops the arena loop and closes open sockets
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = arena_task.await {
        error!(error = %e, "Arena task failed");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Bind the listener, retrying with exponential backoff
async fn bind_with_retry(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let mut attempt = 0;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt + 1 < BIND_ATTEMPTS => {
                let delay = backoff_delay(attempt, BIND_BACKOFF_BASE, BIND_BACKOFF_MAX);
                error!(
                    addr = %addr,
                    attempt = attempt + 1,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Failed to bind, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(addr = %addr, error = %e, "Failed to bind, giving up");
                return Err(e).with_context(|| format!("Failed to bind {addr}"));
            }
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
