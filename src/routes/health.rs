//! Health and probe endpoints.
//!
//! # Endpoints
//! - `GET /health`: liveness plus process details
//! - `GET /health/detailed`: per-service status
//! - `GET /ready`: readiness, gated on a startup delay
//! - `GET /live`: bare liveness

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::http::{now_iso8601, AppState, RequestContext};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed))
        .route("/ready", get(ready))
        .route("/live", get(live))
}

async fn health(State(state): State<AppState>, request: Request) -> Json<Value> {
    let response_time = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| format!("{}ms", ctx.response_time_ms()))
        .unwrap_or_else(|| "0ms".to_string());

    Json(json!({
        "status": "UP",
        "message": "System operating normally",
        "timestamp": now_iso8601(),
        "uptime": state.uptime().as_secs(),
        "environment": state.config.environment.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
        "system": {
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "pid": std::process::id(),
        },
        "checks": {
            "database": "N/A",
            "externalServices": "N/A",
        },
        "responseTime": response_time,
    }))
}

async fn detailed(State(state): State<AppState>) -> Json<Value> {
    let uptime = state.uptime();
    let signatures = !state.engine.classifier.registry().is_empty();

    Json(json!({
        "status": "UP",
        "timestamp": now_iso8601(),
        "services": {
            "application": "UP",
            "threatSignatures": if signatures { "UP" } else { "DOWN" },
            "rateLimiter": if state.config.rate_limit.enabled { "UP" } else { "DISABLED" },
            "uptime": if uptime > Duration::ZERO { "UP" } else { "DOWN" },
        },
        "metrics": {
            "uptime": uptime.as_secs_f64(),
            "trackedClients": state.limiter.tracked_clients(),
            "platform": std::env::consts::OS,
        },
    }))
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let delay = Duration::from_secs(state.config.health.readiness_delay_secs);

    if state.uptime() >= delay {
        (
            StatusCode::OK,
            Json(json!({
                "status": "READY",
                "message": "Ready to accept traffic",
                "timestamp": now_iso8601(),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "NOT_READY",
                "message": "Still initializing",
                "timestamp": now_iso8601(),
            })),
        )
    }
}

async fn live() -> Json<Value> {
    Json(json!({
        "status": "ALIVE",
        "message": "Responding",
        "timestamp": now_iso8601(),
        "pid": std::process::id(),
    }))
}
