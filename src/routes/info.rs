//! Application banner.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::http::{now_iso8601, AppState};

pub const FEATURES: &[&str] = &[
    "Secure REST API",
    "Health checks",
    "Structured logging",
    "Rate limiting",
    "Input validation",
    "Error handling",
];

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    let enabled = |on: bool| if on { "enabled" } else { "disabled" };

    Json(json!({
        "message": "Secure API with threat detection and input sanitization",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": config.environment.as_str(),
        "timestamp": now_iso8601(),
        "security": {
            "headers": "enabled",
            "cors": "configured",
            "rateLimit": enabled(config.rate_limit.enabled),
            "inputValidation": "enabled",
            "compression": "enabled",
        },
        "features": FEATURES,
    }))
}
