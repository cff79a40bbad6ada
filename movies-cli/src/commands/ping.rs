//! Database connectivity check

use anyhow::{Context, Result};
use movies_server::db::connect;
use movies_server::{DbConfig, PoolSettings};

/// Connect with the configured credentials, ping, and close.
pub async fn run_ping() -> Result<()> {
    let config = DbConfig::from_env().context("Database configuration incomplete")?;

    let pool = connect(&config, &PoolSettings::default())
        .await
        .context("Failed to connect to database")?;
    pool.close().await;

    println!(
        "Database {} at {}:{} is reachable",
        config.database, config.host, config.port
    );
    Ok(())
}
