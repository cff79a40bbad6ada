//! movies - HTTP service that stores and lists movie titles
//!
//! Subcommands:
//! - `serve`: run the HTTP API on port 8003
//! - `ping`: check database connectivity and exit

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod telemetry;
mod tracing_setup;

use commands::serve::ServeArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "movies",
    author,
    version,
    about = "Store movie titles in PostgreSQL and list them over HTTP"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Export handler spans over OTLP
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Connect to the database, ping it and exit
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug })?;
    match dotenv {
        Some(path) => tracing::info!("Loaded configuration from {}", path.display()),
        None => tracing::info!("No .env file found, relying on system environment variables"),
    }

    match cli.command {
        Commands::Serve(args) => commands::serve::run_serve(args, cli.otel).await,
        Commands::Ping => commands::ping::run_ping().await,
    }
}
