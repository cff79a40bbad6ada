//! movies-server: HTTP service for a single `movies` table
//!
//! Accepts movie titles over HTTP, persists them through a pooled
//! PostgreSQL connection and lists the stored collection. Every handler
//! runs under a deadline derived from the request and inside a span from
//! an injected [`telemetry::Tracer`].

pub mod config;
pub mod context;
pub mod db;
pub mod http;
pub mod models;
pub mod telemetry;

pub use config::{ConfigError, DbConfig, PoolSettings};
pub use context::Deadline;
pub use db::{Movie, MovieStore, PgMovieStore};
pub use http::{run_server, AppState, ServerConfig};
