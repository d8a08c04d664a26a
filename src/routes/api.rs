//! `/api` endpoints.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Map, Value};
use url::form_urlencoded;

use crate::http::{now_iso8601, AppState, ClientIdentity, IdentityExtractor};
use crate::security::status::run_checks;
use crate::security::RateLimitStatus;
use crate::validation::{enforce_rules, FieldRule, RuleSet, SubmittedInput};

pub const SECURITY_FEATURES: &[&str] = &[
    "Security headers on every response",
    "CORS allow-list",
    "Per-client rate limiting",
    "Declared input validation",
    "XSS detection",
    "SQL injection detection",
    "Request audit logging",
    "Structured error handling",
];

pub const SECURITY_PRACTICES: &[&str] = &[
    "Static analysis",
    "Dependency scanning",
    "Container scanning",
    "Automated security tests",
    "Infrastructure as code",
    "Continuous monitoring",
    "Security headers",
    "Automatic input sanitization",
];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/security", get(security))
        .route(
            "/validate",
            post(validate).route_layer(middleware::from_fn_with_state(
                Arc::new(validate_rules()),
                enforce_rules,
            )),
        )
        .route("/demo", get(demo))
}

/// Rules declared by `POST /api/validate`.
pub fn validate_rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::required("data"),
        FieldRule::length("data", 1, 1000),
        FieldRule::one_of("type", &["text", "email", "url"]).optional(),
    ])
}

async fn info() -> Json<Value> {
    let endpoint = |method: &str, path: &str, description: &str| {
        json!({ "method": method, "path": path, "description": description })
    };

    Json(json!({
        "message": "API protected by security middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "security": {
            "features": SECURITY_FEATURES,
            "practices": SECURITY_PRACTICES,
        },
        "endpoints": [
            endpoint("GET", "/api/info", "API information"),
            endpoint("GET", "/api/security", "Security status"),
            endpoint("POST", "/api/validate", "Validate input"),
            endpoint("GET", "/api/demo", "Demonstration endpoint"),
        ],
        "timestamp": now_iso8601(),
    }))
}

async fn security(State(state): State<AppState>) -> Json<Value> {
    let checks = run_checks(&state.engine.classifier, &state.engine.headers);
    let (status, message) = if checks.all_passing() {
        ("SECURE", "All security measures active")
    } else {
        ("DEGRADED", "One or more security self-checks failed")
    };

    Json(json!({
        "status": status,
        "message": message,
        "features": {
            "headers": "Security response headers applied",
            "cors": "Cross-origin access restricted",
            "rateLimit": if state.config.rate_limit.enabled {
                "Per-client request budget enforced"
            } else {
                "Disabled"
            },
            "inputValidation": "Declared rules enforced",
            "compression": "Response compression enabled",
            "logging": "Request audit logging enabled",
        },
        "checks": checks,
        "lastUpdated": now_iso8601(),
    }))
}

/// Classify the payload as submitted. Declared rules have already run, so
/// `data` is present and non-empty.
async fn validate(
    State(state): State<AppState>,
    Extension(submitted): Extension<SubmittedInput>,
) -> Json<Value> {
    let engine = &state.engine;
    let data = submitted.body.get("data").cloned().unwrap_or(Value::Null);
    let kind = submitted
        .body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("text")
        .to_string();

    let verdict = engine.classifier.classify_value(&data);
    let length = data.as_str().map(|s| s.chars().count());

    Json(json!({
        "message": "Validation complete",
        "result": {
            "original": data,
            "sanitized": engine.sanitizer.sanitize_value(data.clone()),
            "isValid": verdict.is_safe,
            "type": kind,
            "checks": {
                "xssAttempt": verdict.is_xss_match,
                "sqlInjectionAttempt": verdict.is_sql_match,
                "length": length,
                "encoding": "UTF-8",
            },
            "timestamp": now_iso8601(),
        },
    }))
}

/// Echo request metadata as the handler sees it, after sanitization.
async fn demo(State(state): State<AppState>, request: Request) -> Json<Value> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let client = match request.extensions().get::<ClientIdentity>() {
        Some(ClientIdentity(client)) => client.clone(),
        None => IdentityExtractor::from_config(&state.config.rate_limit).extract(&request),
    };

    let query: Map<String, Value> = request
        .uri()
        .query()
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        })
        .unwrap_or_default();

    let remaining = request
        .extensions()
        .get::<RateLimitStatus>()
        .map(|status| json!(status.remaining))
        .unwrap_or_else(|| json!("N/A"));

    Json(json!({
        "message": "Demonstration endpoint working",
        "request": {
            "ip": client,
            "userAgent": header("user-agent"),
            "method": request.method().as_str(),
            "url": request.uri().to_string(),
            "query": query,
            "headers": {
                "content-type": header("content-type"),
                "accept": header("accept"),
                "accept-language": header("accept-language"),
            },
        },
        "server": {
            "timestamp": now_iso8601(),
            "uptime": state.uptime().as_secs_f64(),
            "environment": state.config.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "security": {
            "rateLimitRemaining": remaining,
            "secureHeaders": "applied",
            "inputValidation": "active",
        },
    }))
}
