//! Error types surfaced to clients and at startup.
//!
//! Every request-level failure maps to a structured JSON body carrying an
//! `error` message and an ISO-8601 `timestamp`. Startup failures are fatal.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::http::response::now_iso8601;
use crate::routes::AVAILABLE_ENDPOINTS;
use crate::validation::ValidationError;

/// Failures that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("threat signature failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid header policy: {0}")]
    Header(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures produced while handling a request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input data")]
    Validation(Vec<ValidationError>),

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after: Duration, window: Duration },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Request body could not be read")]
    UnreadableBody,

    #[error("Request timed out")]
    Timeout,

    #[error("Endpoint not found")]
    NotFound { method: Method, uri: String },

    #[error("Internal server error")]
    Internal {
        message: String,
        /// Include `message` in the body (non-production only).
        expose: bool,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnreadableBody => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let timestamp = now_iso8601();

        match self {
            ApiError::Validation(details) => {
                (status, Json(json!({ "error": error, "details": details, "timestamp": timestamp })))
                    .into_response()
            }
            ApiError::RateLimited { retry_after, window } => {
                let minutes = window.as_secs().div_ceil(60).max(1);
                let mut response = (
                    status,
                    Json(json!({
                        "error": error,
                        "retryAfter": format!("{} minutes", minutes),
                        "timestamp": timestamp,
                    })),
                )
                    .into_response();
                let seconds = retry_after.as_secs_f64().ceil() as u64;
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
                response
            }
            ApiError::PayloadTooLarge { .. } | ApiError::UnreadableBody | ApiError::Timeout => {
                (status, Json(json!({ "error": error, "timestamp": timestamp }))).into_response()
            }
            ApiError::NotFound { method, uri } => (
                status,
                Json(json!({
                    "error": error,
                    "message": "The requested route does not exist",
                    "requestedUrl": uri,
                    "method": method.as_str(),
                    "timestamp": timestamp,
                    "availableEndpoints": AVAILABLE_ENDPOINTS,
                })),
            )
                .into_response(),
            ApiError::Internal { message, expose } => {
                let body = if expose {
                    json!({ "error": error, "message": message, "timestamp": timestamp })
                } else {
                    json!({
                        "error": error,
                        "message": "Something went wrong on the server",
                        "timestamp": timestamp,
                    })
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
