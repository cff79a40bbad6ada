//! Database connection pool management
//!
//! Uses sqlx PgPool with explicit connection limits and a bounded
//! connection lifetime, so connections held open behind a proxy or load
//! balancer are recycled periodically.
//!
//! [`spawn_pool_stats`] reports pool occupancy as a periodic log event.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{DbConfig, PoolSettings};

/// Failure to open or verify the pool, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to open database pool: {0}")]
    Open(#[source] sqlx::Error),

    #[error("database is unreachable: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Create a PostgreSQL connection pool and verify it with a ping.
///
/// # Errors
///
/// Returns [`ConnectError`] if the pool cannot be opened or the first
/// connection does not answer.
///
/// # Example
///
/// ```ignore
/// let config = DbConfig::from_env()?;
/// let pool = connect(&config, &PoolSettings::default()).await?;
/// ```
pub async fn connect(config: &DbConfig, settings: &PoolSettings) -> Result<PgPool, ConnectError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .max_lifetime(settings.max_lifetime)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(config.connect_options())
        .await
        .map_err(ConnectError::Open)?;

    let mut conn = pool.acquire().await.map_err(ConnectError::Ping)?;
    conn.ping().await.map_err(ConnectError::Ping)?;
    drop(conn);

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        max_connections = settings.max_connections,
        "Connected to database"
    );

    Ok(pool)
}

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently open, idle or checked out
    pub open: u32,
    pub idle: usize,
    pub max_open: u32,
}

impl PoolStats {
    pub fn snapshot(pool: &PgPool) -> Self {
        Self {
            open: pool.size(),
            idle: pool.num_idle(),
            max_open: pool.options().get_max_connections(),
        }
    }

    pub fn in_use(&self) -> usize {
        (self.open as usize).saturating_sub(self.idle)
    }
}

/// Log a [`PoolStats`] snapshot every `every` until the pool closes.
pub fn spawn_pool_stats(pool: PgPool, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }

            let stats = PoolStats::snapshot(&pool);
            tracing::info!(
                db.system = "postgresql",
                open = stats.open,
                idle = stats.idle,
                in_use = stats.in_use(),
                max_open = stats.max_open,
                "Pool stats"
            );
        }

        tracing::debug!("Pool closed, stats reporter stopped");
    })
}
