//! API error types with IntoResponse
//!
//! Errors become plain-text responses. The client sees the message from
//! `Display`; [`ApiError::detail`] carries the underlying cause for spans
//! and logs.

use std::fmt;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::DbError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Wrong verb for the route (405)
    MethodNotAllowed,

    /// Request body could not be read (500)
    BodyRead { reason: String },

    /// Request body over the accepted size (413)
    PayloadTooLarge { limit: usize },

    /// Malformed client input (400)
    Validation(ValidationError),

    /// Query, scan or deadline failure (500)
    Database(DbError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BodyRead { .. } | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Full error text for span status and logs.
    pub fn detail(&self) -> String {
        match self {
            Self::BodyRead { reason } => format!("{}: {}", self, reason),
            Self::PayloadTooLarge { limit } => format!("{} (limit {} bytes)", self, limit),
            Self::Validation(ValidationError::InvalidJson { reason }) => {
                format!("{}: {}", self, reason)
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MethodNotAllowed => write!(f, "Method not allowed"),
            Self::BodyRead { .. } => write!(f, "Error reading request body"),
            Self::PayloadTooLarge { .. } => write!(f, "Request body too large"),
            Self::Validation(e) => write!(f, "{}", e),
            Self::Database(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Database(e) => tracing::error!(error = %e, "Database error"),
            Self::BodyRead { reason } => tracing::error!(error = %reason, "Failed to read request body"),
            Self::Validation(_) | Self::MethodNotAllowed | Self::PayloadTooLarge { .. } => {
                tracing::debug!(status = status.as_u16(), error = %self.detail(), "Rejected request")
            }
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::to_bytes;

    use crate::context::DeadlineExceeded;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Missing { field: "name" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Missing or invalid 'name' field");
    }

    #[tokio::test]
    async fn method_not_allowed_is_405() {
        let response = ApiError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn database_error_is_500_with_error_text() {
        let err = ApiError::Database(DbError::DeadlineExceeded(DeadlineExceeded {
            budget: Duration::from_secs(3),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("deadline exceeded"));
    }

    #[test]
    fn body_read_hides_cause_from_client() {
        let err = ApiError::BodyRead {
            reason: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "Error reading request body");
        assert_eq!(err.detail(), "Error reading request body: connection reset");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let err = ApiError::PayloadTooLarge { limit: 2 * 1024 * 1024 };
        assert_eq!(err.detail(), "Request body too large (limit 2097152 bytes)");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_text(response).await, "Request body too large");
    }
}
