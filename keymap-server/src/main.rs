//! Keymap Server - opaque webhook key registry.
//!
//! This binary:
//! - Connects the shared PostgreSQL pool and runs migrations
//! - Serves the listen / event endpoints backed by the registry
//! - Optionally serves the Slack OAuth redirect
//! - Shuts down gracefully on SIGINT/SIGTERM

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use keymap::{db, web, AppState, Config, Registry, SlackClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("keymap_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        database_url_set = !config.database_url.is_empty(),
        max_connections = config.database_max_connections,
        run_migrations = config.run_migrations,
        webhook_entry_url = %config.webhook_entry_url,
        slack_configured = config.slack_enabled(),
        "config_loaded"
    );

    // Create the shared connection pool
    let pool = db::create_pool(&config).await?;
    if config.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let slack = SlackClient::from_config(&config).context("Failed to create Slack client")?;

    // Create application state
    let state = AppState::new(config.clone(), Registry::postgres(pool.clone()), slack);
    let app = web::router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "keymap_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release pooled connections
    pool.close().await;

    info!("keymap_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("keymap_server_shutting_down");
}
