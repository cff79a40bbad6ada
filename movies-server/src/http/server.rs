//! Axum server setup
//!
//! Server skeleton with:
//! - 10s request deadline, 11s hard timeout and 1 MiB header limit
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::routes::build_router;
use crate::db::MovieStore;
use crate::telemetry::Tracer;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8003)
    pub bind_addr: SocketAddr,

    /// Upper bound on handling one request, and the parent deadline
    /// every datastore call is derived from
    pub request_timeout: Duration,

    pub max_header_bytes: usize,
}

/// Grace past `request_timeout` before a request is abandoned outright
pub const HARD_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

impl ServerConfig {
    /// Connection-level cutoff, strictly later than any handler deadline.
    pub fn hard_timeout(&self) -> Duration {
        self.request_timeout + HARD_TIMEOUT_MARGIN
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8003)),
            request_timeout: Duration::from_secs(10),
            max_header_bytes: 1 << 20,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MovieStore>,
    pub tracer: Arc<dyn Tracer>,
}

impl AppState {
    pub fn new(store: impl MovieStore, tracer: impl Tracer) -> Self {
        Self {
            store: Arc::new(store),
            tracer: Arc::new(tracer),
        }
    }
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let pool = connect(&DbConfig::from_env()?, &PoolSettings::default()).await?;
/// let state = AppState::new(PgMovieStore::new(pool), NoopTracer);
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
