mod api;
mod config;
mod db;
mod errors;
mod logger;
mod metrics;
mod models;
mod services;
mod throttle;
mod utils;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::handlers::AppStateInner;
use api::routes::create_router;
use config::Config;
use logger::{AppLogger, ConsoleSink, FileSink};

/// How often idle throttle state is dropped
const THROTTLE_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,student_registry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Student Registry v{}", env!("CARGO_PKG_VERSION"));

    // Initialize metrics
    metrics::registry::init_metrics();
    info!("Metrics registry initialized");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Application logger: console plus log file
    let file_sink = FileSink::open(&config.logging.log_dir)
        .with_context(|| format!("Failed to open log directory {}", config.logging.log_dir))?;
    let logger = Arc::new(AppLogger::new().with_sink(ConsoleSink).with_sink(file_sink));

    // Initialize database backend
    info!("Connecting to database...");
    let db = db::init_database(&config.database)
        .await
        .context("Failed to initialize database")?;

    db.test_connection()
        .await
        .context("Failed to test database connection")?;
    info!("Database ready ({})", db.kind());

    // Create application state
    let state = Arc::new(
        AppStateInner::new(db, &logger, &config)
            .context("Failed to build application state")?,
    );

    // Drop idle throttle entries in the background
    let _prune_handle = throttle::start_pruning_job(
        vec![
            state.global_throttler.clone(),
            state.lookup_throttler.clone(),
        ],
        THROTTLE_PRUNE_INTERVAL,
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = config.server_address();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    // Serve with graceful shutdown; peer addresses feed the throttle keys
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    logger.shutdown();
    info!("Server shutdown complete");

    Ok(())
}
