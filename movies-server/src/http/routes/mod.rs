//! Route handlers organized by resource

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{limit_header_size, request_deadline};
use super::server::{AppState, ServerConfig};

pub mod index;
pub mod movies;

/// Build the application router with all routes and middleware.
///
/// Handlers answer on their own deadlines, which never outlive
/// `request_timeout`. The outer [`TimeoutLayer`] only fires for a handler
/// that ignores its deadline, so it waits [`ServerConfig::hard_timeout`].
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.hard_timeout(),
        ))
        .layer(from_fn_with_state(config.max_header_bytes, limit_header_size))
        .layer(from_fn_with_state(config.request_timeout, request_deadline));

    Router::new()
        .merge(index::router())
        .merge(movies::router())
        .layer(middleware)
        .with_state(state)
}
