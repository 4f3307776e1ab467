//! Repo Lookup - A cache-aside HTTP lookup service
//!
//! Resolves GitHub public repository counts per username, caching results
//! for a fixed TTL to avoid redundant upstream calls.

mod api;
mod cache;
mod config;
mod error;
mod lookup;
mod models;
mod tasks;
mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use cache::MemoryStore;
use config::Config;
use lookup::LookupCoordinator;
use tasks::spawn_cleanup_task;
use upstream::GitHubClient;

/// Main entry point for the lookup service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Construct the cache store and upstream client (fatal on failure)
/// 4. Wire both into the lookup coordinator
/// 5. Start background TTL cleanup task
/// 6. Create Axum router and start the HTTP server
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_lookup=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Repo Lookup Service");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: ttl={}s, upstream={}, port={}, cleanup_interval={}s",
        config.ttl_seconds, config.upstream_base_url, config.server_port, config.cleanup_interval
    );

    // The store and client outlive every request; the process does not
    // start without them.
    let store = MemoryStore::new();
    let upstream = match GitHubClient::new(
        config.upstream_base_url.as_str(),
        Duration::from_secs(config.request_timeout),
    ) {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to construct upstream client: {err}");
            std::process::exit(1);
        }
    };

    let coordinator = LookupCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(upstream),
        Duration::from_secs(config.ttl_seconds),
    );
    let state = AppState::new(coordinator);
    info!("Lookup coordinator initialized");

    // Start background cleanup task
    let cleanup_handle = spawn_cleanup_task(store, config.cleanup_interval);
    info!("Background cleanup task started");

    // Create router with all endpoints
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .unwrap();

    info!("Server shutdown complete");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the cleanup task
    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
