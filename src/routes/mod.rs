//! Route surface.
//!
//! Thin handlers exposing the security engine over HTTP. All pipeline
//! concerns (admission, sanitization, headers) live in middleware; the only
//! per-route wiring is the declared rule set on `POST /api/validate`.

pub mod api;
pub mod health;
pub mod info;

use axum::{
    http::{Method, Uri},
    routing::get,
    Router,
};

use crate::error::ApiError;
use crate::http::AppState;

/// Endpoint catalogue returned with every 404.
pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /health/detailed",
    "GET /ready",
    "GET /live",
    "GET /api/info",
    "GET /api/security",
    "POST /api/validate",
    "GET /api/demo",
];

/// Every route plus the 404 fallback, with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info::root))
        .merge(health::routes())
        .nest("/api", api::routes())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(method = %method, uri = %uri, "No route matched");
    ApiError::NotFound {
        method,
        uri: uri.to_string(),
    }
}
