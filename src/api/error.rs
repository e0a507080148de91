//! Bridge errors
//!
//! Only malformed requests and server failures surface as HTTP errors.
//! Failures of individual query targets are part of a successful response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that reject a whole bridge request
#[derive(Error, Debug)]
pub enum ApiError {
    /// A query request without targets
    #[error("Query request has no targets")]
    NoTargets,

    /// `range.from` lies after `range.to`
    #[error(
        "Time range starts after it ends: {} > {}",
        .from.to_rfc3339_opts(SecondsFormat::Millis, true),
        .to.to_rfc3339_opts(SecondsFormat::Millis, true)
    )]
    InvertedRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// The listener could not be bound or the server failed
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NoTargets => (StatusCode::BAD_REQUEST, "NO_TARGETS"),
            ApiError::InvertedRange { .. } => (StatusCode::BAD_REQUEST, "INVERTED_RANGE"),
            ApiError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, code, error = %self, "Bridge request failed");
        } else {
            tracing::warn!(request_id = %request_id, code, error = %self, "Rejected query request");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for bridge handlers
pub type ApiResult<T> = Result<T, ApiError>;
