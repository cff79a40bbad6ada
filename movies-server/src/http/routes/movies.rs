//! Movie endpoints
//!
//! Both routes accept every method and reject the wrong ones inside the
//! handler, so a 405 is traced like any other failure.
//!
//! Each handler: validate method, parse body, derive deadline, call the
//! store, respond. The span is opened on entry and closed on every exit.
//! The store call gets its own child span carrying the `db.*` attributes.

use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde::Serialize;

use crate::context::Deadline;
use crate::db::movies::TABLE;
use crate::db::{DbError, Movie};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::CreateMovieRequest;
use crate::telemetry::SpanGuard;

/// Cap on a single insert
pub const INSERT_TIMEOUT: Duration = Duration::from_secs(3);

/// Cap on a full-table scan
pub const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest accepted `POST /movie` body
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Create confirmation
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: i64,
}

/// POST /movie
async fn create_movie(State(state): State<AppState>, request: Request) -> Response {
    let mut span = open_span(&state, "insert-movie-handler", "/movie", &request);

    match insert_movie(&state, &mut span, request).await {
        Ok(id) => {
            span.set_attribute("movie.id", id.to_string());
            (
                StatusCode::CREATED,
                Json(CreatedResponse {
                    message: "Movie inserted successfully",
                    id,
                }),
            )
                .into_response()
        }
        Err(err) => fail(&mut span, err),
    }
}

async fn insert_movie(state: &AppState, span: &mut SpanGuard, request: Request) -> Result<i64, ApiError> {
    if request.method() != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let parent = request.extensions().get::<Deadline>().copied();

    let body = Bytes::from_request(request, &()).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: MAX_BODY_BYTES,
            }
        } else {
            ApiError::BodyRead {
                reason: rejection.body_text(),
            }
        }
    })?;

    let title = CreateMovieRequest::from_slice(&body)?.into_title()?;

    let deadline = Deadline::within(parent, INSERT_TIMEOUT);
    let db_span = store_span(state, span, "db.insert", "INSERT");
    let id = traced(db_span, state.store.insert(deadline, title.as_str())).await?;

    Ok(id)
}

/// GET /movies
async fn list_movies(State(state): State<AppState>, request: Request) -> Response {
    let mut span = open_span(&state, "get-movies-handler", "/movies", &request);

    let method = request.method().clone();
    let parent = request.extensions().get::<Deadline>().copied();

    match fetch_movies(&state, &mut span, &method, parent).await {
        Ok(movies) => {
            span.set_attribute("movies.count", movies.len().to_string());
            (StatusCode::OK, Json(movies)).into_response()
        }
        Err(err) => fail(&mut span, err),
    }
}

async fn fetch_movies(
    state: &AppState,
    span: &mut SpanGuard,
    method: &Method,
    parent: Option<Deadline>,
) -> Result<Vec<Movie>, ApiError> {
    if method != Method::GET {
        return Err(ApiError::MethodNotAllowed);
    }

    let deadline = Deadline::within(parent, LIST_TIMEOUT);
    let db_span = store_span(state, span, "db.select", "SELECT");

    Ok(traced(db_span, state.store.list_all(deadline)).await?)
}

fn open_span(state: &AppState, name: &'static str, path: &'static str, request: &Request) -> SpanGuard {
    let mut span = state.tracer.start(name, request.headers());
    span.set_attribute("http.method", request.method().as_str());
    span.set_attribute("http.path", path);
    span
}

/// Child of the handler span describing one datastore call.
fn store_span(state: &AppState, parent: &SpanGuard, name: &'static str, operation: &'static str) -> SpanGuard {
    let mut span = parent.child(name);
    span.set_attribute("db.operation", operation);
    span.set_attribute("db.collection.name", TABLE);
    for (key, value) in state.store.span_attributes() {
        span.set_attribute(key, value);
    }
    span
}

/// Run a store call inside `span`, marking the span on failure.
async fn traced<T>(mut span: SpanGuard, call: impl Future<Output = Result<T, DbError>>) -> Result<T, DbError> {
    let result = call.await;
    if let Err(e) = &result {
        span.record_error(&e.to_string());
    }
    result
}

fn fail(span: &mut SpanGuard, err: ApiError) -> Response {
    span.record_error(&err.detail());
    err.into_response()
}

/// Movie routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movie", any(create_movie))
        .route("/movies", any(list_movies))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
