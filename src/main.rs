//! Circulation Server - loan lifecycle and inventory engine
//!
//! REST API server for borrow requests, returns, fines and statistics.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation_server::{
    api,
    config::{AppConfig, LoggingConfig, StorageBackend},
    repository::{MemoryStore, PgStore, Store},
    services::{notifications::BroadcastEmitter, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; the guard flushes buffered lines on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Circulation Server v{}", env!("CARGO_PKG_VERSION"));

    // Storage backend
    let store: Store = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            store.migrate().await.context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");
            Arc::new(store)
        }
    };

    // Notifications are logged until an outbound channel subscribes
    let emitter = BroadcastEmitter::new(config.notifications.channel_capacity);
    let mut notifications = emitter.subscribe();
    tokio::spawn(async move {
        while let Some(event) = notifications.next().await {
            match event {
                Ok(n) => tracing::info!(kind = ?n.kind, borrower_id = n.borrower_id, "{}", n.message),
                Err(e) => tracing::warn!("Notification stream lagged: {}", e),
            }
        }
    });

    // Save server address before moving config
    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create services and application state
    let services = Services::new(store, &config, Arc::new(emitter));
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Install the global subscriber writing to stdout through a non-blocking writer
fn init_tracing(logging: &LoggingConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("circulation_server={},tower_http=debug", logging.level).into());
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
