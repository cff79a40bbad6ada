//! Request middleware
//!
//! Over a real socket, hyper's HTTP/1 parser caps the header buffer at
//! roughly 400 KiB and answers 431 itself, so [`limit_header_size`] never
//! sees a larger block there. The guard enforces the configured limit for
//! requests that skip hyper's parser: in-process `oneshot` calls and any
//! transport whose own limit is looser.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::context::Deadline;

/// Stamp the request with a [`Deadline`] of `budget`.
///
/// Handlers derive their datastore deadlines from this one.
pub async fn request_deadline(
    State(budget): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(Deadline::after(budget));
    next.run(request).await
}

/// Reject requests whose header block exceeds `max_bytes`.
pub async fn limit_header_size(
    State(max_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let size = header_block_size(&request);
    if size > max_bytes {
        tracing::warn!(size, max_bytes, "Request headers too large");
        return (
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            "Request header fields too large",
        )
            .into_response();
    }

    next.run(request).await
}

/// Approximate wire size: `name: value\r\n` per header.
fn header_block_size(request: &Request) -> usize {
    request
        .headers()
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum()
}
