//! HTTP server command
//!
//! Startup is strict: missing configuration or an unreachable database
//! ends the process before the listener is bound.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use movies_server::db::{connect, spawn_pool_stats};
use movies_server::{run_server, AppState, DbConfig, PgMovieStore, PoolSettings, ServerConfig};

use crate::telemetry::Telemetry;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', default_value = "0.0.0.0:8003", env = "MOVIES_BIND")]
    pub bind: SocketAddr,

    /// Request timeout in seconds; also caps every database call
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Seconds between pool stats log events
    #[arg(long, default_value = "60")]
    pub pool_stats_interval: u64,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, otel: bool) -> Result<()> {
    let telemetry = Telemetry::init(otel)?;

    let db_config = DbConfig::from_env().context("Database configuration incomplete")?;
    tracing::debug!(config = ?db_config, "Database configuration loaded");

    let pool = connect(&db_config, &PoolSettings::default())
        .await
        .context("Failed to connect to database")?;
    let stats = spawn_pool_stats(pool.clone(), Duration::from_secs(args.pool_stats_interval.max(1)));
    let store = PgMovieStore::new(pool).with_namespace(db_config.database.clone());

    let state = AppState {
        store: Arc::new(store.clone()),
        tracer: telemetry.tracer(),
    };
    let config = ServerConfig {
        bind_addr: args.bind,
        request_timeout: Duration::from_secs(args.timeout),
        ..ServerConfig::default()
    };

    // Run server (blocks until shutdown)
    let result = run_server(state, config).await.context("Server error");

    store.close().await;
    stats.abort();
    telemetry.shutdown().await;

    result
}
