//! HTTP server layer
//!
//! Axum server with:
//! - Explicit router built from [`AppState`]
//! - Request tracing, request timeout and header size guard
//! - Per-request deadline stamped into request extensions
//! - Graceful shutdown
//! - Plain-text error responses

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::build_router;
pub use server::{run_server, AppState, ServerConfig, ServerError};
