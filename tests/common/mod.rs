//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use secure_api::config::{AppConfig, Environment};
use secure_api::HttpServer;

pub const DEFAULT_PEER: &str = "127.0.0.1:40000";

/// Test configuration: no readiness delay, roomy rate budget.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = Environment::Test;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.rate_limit.max_requests = Some(50);
    config.health.readiness_delay_secs = 0;
    config
}

pub fn app(config: AppConfig) -> Router {
    HttpServer::new(config).expect("test config is valid").router()
}

/// Drive one request through the full layer stack.
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("valid peer address");
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub fn get(uri: &str) -> Request<Body> {
    from_peer(
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
        DEFAULT_PEER,
    )
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    from_peer(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        DEFAULT_PEER,
    )
}

pub fn post_form(uri: &str, body: &'static str) -> Request<Body> {
    from_peer(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap(),
        DEFAULT_PEER,
    )
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

pub fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .expect("header is ASCII")
}
