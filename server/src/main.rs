//! HotelBook server - webhook receiver for identity-provider user events.
//!
//! This binary:
//! - Connects to MongoDB once at startup (fatal on failure)
//! - Serves the Clerk webhook and health routes
//! - Closes the database client on graceful shutdown

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hotelbook::web::{WEBHOOK_ALIAS_PATH, WEBHOOK_PATH};
use hotelbook::{router, AppState, Config, MongoUserStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!(dotenv_loaded, "server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        mongodb_url_set = config.mongodb_url.is_some(),
        mongodb_database = ?config.mongodb_database,
        webhook_secret_configured = config.webhook_secret_configured(),
        webhook_tolerance_secs = config.webhook_tolerance_secs,
        "config_loaded"
    );

    if !config.webhook_secret_configured() {
        warn!("webhook_secret_not_configured");
    }

    let mongodb_url = config
        .mongodb_url
        .clone()
        .context("MONGODB_URL must be set")?;

    // Open the process-wide store handle
    let store: Arc<dyn UserStore> = Arc::new(
        MongoUserStore::connect(&mongodb_url, config.mongodb_database.as_deref())
            .await
            .context("Failed to connect to MongoDB")?,
    );

    let state = AppState::new(config.clone(), store.clone());
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(
        address = %addr,
        webhook_path = WEBHOOK_PATH,
        webhook_alias_path = WEBHOOK_ALIAS_PATH,
        "server_listening"
    );

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;

    info!("server_shutdown_complete");

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

    info!("server_shutting_down");
}
