//! Taskboard server -- task API with live update notifications.
//!
//! An axum server that stores tasks and users in a document store and pushes
//! a `tasksUpdated` event to connected WebSocket clients whenever tasks
//! change.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5000 with an in-memory store
//! cargo run --bin taskboard-server
//!
//! # Use MongoDB
//! cargo run --bin taskboard-server -- --mongo-uri mongodb://localhost:27017
//!
//! # Or via environment variables
//! PORT=8080 TASKBOARD_MONGO_URI=mongodb://localhost:27017 cargo run --bin taskboard-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig, StoreBackend};
use taskboard_server::notify::BroadcastHub;
use taskboard_server::server::{self, AppState};
use taskboard_server::store::{DocumentStore, MemoryStore, MongoStore};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskboard server");

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("no MongoDB URI configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo { uri, database } => match MongoStore::connect(uri, database).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!(error = %e, "failed to connect to MongoDB");
                std::process::exit(1);
            }
        },
    };

    let hub = Arc::new(BroadcastHub::new());
    let state = Arc::new(
        AppState::new(store, Arc::clone(&hub)).with_timestamps(config.stamp_timestamp),
    );
    let app = server::router(state, config.max_body_size);

    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        let closed = hub.close_all();
        tracing::info!(observers = closed, "shutdown requested, closing observers");
    };

    match server::start_server_with_shutdown(&config.bind_addr, app, shutdown).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
            tracing::info!("server stopped");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
