//! Request metadata.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4) when the client sent none
//! - Capture the per-request context (id, start time) used for timing
//! - Resolve the client identity used as the rate-limit key
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An inbound `x-request-id` is propagated unchanged
//! - Forwarded identity headers are only trusted when configured

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::RateLimitConfig;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Per-request record, discarded once the response is sent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Printable form of the request ID, for logs.
    pub request_id: String,
    /// The ID header exactly as received, echoed back unchanged.
    pub request_id_header: Option<HeaderValue>,
    pub started_at: Instant,
    pub method: Method,
    pub path: String,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let request_id_header = request.headers().get(X_REQUEST_ID).cloned();
        let request_id = request_id_header
            .as_ref()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            request_id,
            request_id_header,
            started_at: Instant::now(),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Wall-clock time since receipt, in whole milliseconds.
    pub fn response_time_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }
}

/// Rate-limit key of an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

/// Resolves the client identity: the first entry of the trusted header when
/// one is configured and present, otherwise the peer IP.
#[derive(Debug, Clone, Default)]
pub struct IdentityExtractor {
    trusted_header: Option<HeaderName>,
}

impl IdentityExtractor {
    pub fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config
                .identity_header
                .as_deref()
                .and_then(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
        )
    }

    pub fn extract<B>(&self, request: &Request<B>) -> String {
        let forwarded = self.trusted_header.as_ref().and_then(|name| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

        if let Some(identity) = forwarded {
            return identity.to_string();
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(addr: &str) -> Request<Body> {
        let mut request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn test_peer_address_by_default() {
        let extractor = IdentityExtractor::default();
        assert_eq!(extractor.extract(&request_from("192.0.2.1:5000")), "192.0.2.1");
    }

    #[test]
    fn test_trusted_header_first_hop() {
        let extractor = IdentityExtractor::new(Some(HeaderName::from_static("x-forwarded-for")));
        assert_eq!(extractor.extract(&request_from("192.0.2.1:5000")), "203.0.113.9");
    }

    #[test]
    fn test_unknown_without_connect_info() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(IdentityExtractor::default().extract(&request), "unknown");
    }

    #[test]
    fn test_context_reads_request_id() {
        let request = Request::builder()
            .uri("/health?x=1")
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.request_id, "abc-123");
        assert_eq!(ctx.path, "/health");
    }

    #[test]
    fn test_context_keeps_opaque_request_id_bytes() {
        let raw = HeaderValue::from_bytes(b"trace-caf\xc3\xa9").unwrap();
        assert!(raw.to_str().is_err());

        let request = Request::builder()
            .uri("/")
            .header(X_REQUEST_ID, raw.clone())
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.request_id_header, Some(raw));
        assert_eq!(ctx.request_id, "trace-café");
    }

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let id = RequestUuid.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
