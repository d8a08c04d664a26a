//! Response decoration.
//!
//! # Responsibilities
//! - Run an ordered chain of before-send stages on every response
//! - Attach security headers, request ID, rate-limit headers and the
//!   response time
//! - Emit the per-request audit log line and request metrics
//! - Re-render bare 408/413 responses from tower-http layers as structured
//!   JSON errors
//!
//! # Design Decisions
//! - Stages run after the inner service returns, so rejections, 404s and
//!   5xx responses are decorated exactly like successes
//! - The response-time stage runs last and sets its header exactly once

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};

use crate::error::ApiError;
use crate::http::request::{IdentityExtractor, RequestContext, X_REQUEST_ID};
use crate::observability::metrics;
use crate::security::{RateLimitStatus, SecurityHeaders};

pub const X_RESPONSE_TIME: &str = "x-response-time";
pub const RATELIMIT_LIMIT: &str = "ratelimit-limit";
pub const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
pub const RATELIMIT_RESET: &str = "ratelimit-reset";

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A before-send hook contributing to the outgoing response.
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &RequestContext, response: &mut Response);
}

/// Fixed security header set.
pub struct SecurityHeaderStage(pub Arc<SecurityHeaders>);

impl ResponseStage for SecurityHeaderStage {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    fn apply(&self, _ctx: &RequestContext, response: &mut Response) {
        self.0.apply(response.headers_mut());
    }
}

/// Echoes the request ID.
pub struct RequestIdStage;

impl ResponseStage for RequestIdStage {
    fn name(&self) -> &'static str {
        "request-id"
    }

    fn apply(&self, ctx: &RequestContext, response: &mut Response) {
        let value = match &ctx.request_id_header {
            Some(raw) => raw.clone(),
            None => match HeaderValue::from_str(&ctx.request_id) {
                Ok(value) => value,
                Err(_) => return,
            },
        };
        response
            .headers_mut()
            .insert(HeaderName::from_static(X_REQUEST_ID), value);
    }
}

/// Renders the admission outcome left in the response extensions by the
/// rate limiter.
pub struct RateLimitHeaderStage;

impl ResponseStage for RateLimitHeaderStage {
    fn name(&self) -> &'static str {
        "rate-limit-headers"
    }

    fn apply(&self, _ctx: &RequestContext, response: &mut Response) {
        let Some(status) = response.extensions().get::<RateLimitStatus>().copied() else {
            return;
        };

        let reset_secs = status.reset_after.as_secs_f64().ceil() as u64;
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(RATELIMIT_LIMIT), HeaderValue::from(status.limit));
        headers.insert(
            HeaderName::from_static(RATELIMIT_REMAINING),
            HeaderValue::from(status.remaining),
        );
        headers.insert(HeaderName::from_static(RATELIMIT_RESET), HeaderValue::from(reset_secs));
    }
}

/// Wall-clock time since receipt, as `<n>ms`.
pub struct ResponseTimeStage;

impl ResponseStage for ResponseTimeStage {
    fn name(&self) -> &'static str {
        "response-time"
    }

    fn apply(&self, ctx: &RequestContext, response: &mut Response) {
        let value = format!("{}ms", ctx.response_time_ms());
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_RESPONSE_TIME), value);
        }
    }
}

/// Ordered stage chain plus what the middleware needs for audit logging.
#[derive(Clone)]
pub struct ResponsePolicy {
    stages: Arc<Vec<Box<dyn ResponseStage>>>,
    identity: IdentityExtractor,
}

impl ResponsePolicy {
    pub fn new(stages: Vec<Box<dyn ResponseStage>>, identity: IdentityExtractor) -> Self {
        Self {
            stages: Arc::new(stages),
            identity,
        }
    }

    /// Security headers, request ID, rate-limit headers, then timing.
    pub fn standard(headers: Arc<SecurityHeaders>, identity: IdentityExtractor) -> Self {
        Self::new(
            vec![
                Box::new(SecurityHeaderStage(headers)),
                Box::new(RequestIdStage),
                Box::new(RateLimitHeaderStage),
                Box::new(ResponseTimeStage),
            ],
            identity,
        )
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn apply(&self, ctx: &RequestContext, response: &mut Response) {
        for stage in self.stages.iter() {
            stage.apply(ctx, response);
        }
    }
}

/// Outermost application middleware: builds the request context, audits
/// the request, and decorates whatever response comes back.
pub async fn response_policy_middleware(
    State(policy): State<ResponsePolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_request(&request);

    let (user_agent, referer) = {
        let header_or_dash = |name: header::HeaderName| -> String {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        (header_or_dash(header::USER_AGENT), header_or_dash(header::REFERER))
    };
    let client = policy.identity.extract(&request);

    tracing::info!(
        target: "secure_api::audit",
        request_id = %ctx.request_id,
        method = %ctx.method,
        uri = %request.uri(),
        client = %client,
        user_agent = %user_agent,
        referer = %referer,
        "Request received"
    );

    request.extensions_mut().insert(ctx.clone());
    let mut response = next.run(request).await;

    policy.apply(&ctx, &mut response);
    metrics::record_request(ctx.method.as_str(), response.status().as_u16(), ctx.started_at);

    response
}

/// Replace the plain-text bodies tower-http's timeout and body-limit layers
/// produce with the JSON error shape. Response extensions are carried over.
pub async fn structured_rejections(
    State(max_body_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    let error = match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge {
            limit: max_body_bytes,
        },
        StatusCode::REQUEST_TIMEOUT => ApiError::Timeout,
        _ => return response,
    };

    tracing::debug!(status = %response.status(), "Rewriting layer rejection as JSON");
    let (parts, _) = response.into_parts();
    let mut rewritten = error.into_response();
    rewritten.extensions_mut().extend(parts.extensions);
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderPolicyConfig;
    use axum::body::Body;
    use std::time::Duration;

    fn ctx() -> RequestContext {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap();
        RequestContext::from_request(&request)
    }

    #[test]
    fn test_standard_stage_order() {
        let headers = Arc::new(SecurityHeaders::from_config(&HeaderPolicyConfig::default()).unwrap());
        let policy = ResponsePolicy::standard(headers, IdentityExtractor::default());
        assert_eq!(
            policy.stage_names(),
            vec!["security-headers", "request-id", "rate-limit-headers", "response-time"]
        );
    }

    #[test]
    fn test_stages_decorate_response() {
        let headers = Arc::new(SecurityHeaders::from_config(&HeaderPolicyConfig::default()).unwrap());
        let policy = ResponsePolicy::standard(headers, IdentityExtractor::default());

        let mut response = Response::new(Body::empty());
        response.extensions_mut().insert(RateLimitStatus {
            allowed: true,
            limit: 10,
            remaining: 7,
            reset_after: Duration::from_millis(2500),
        });
        policy.apply(&ctx(), &mut response);

        let h = response.headers();
        assert_eq!(h[X_REQUEST_ID], "req-1");
        assert_eq!(h[RATELIMIT_LIMIT], "10");
        assert_eq!(h[RATELIMIT_REMAINING], "7");
        assert_eq!(h[RATELIMIT_RESET], "3");
        assert_eq!(h["x-content-type-options"], "nosniff");
        assert!(h[X_RESPONSE_TIME].to_str().unwrap().ends_with("ms"));
        assert_eq!(h.get_all(X_RESPONSE_TIME).iter().count(), 1);
    }

    #[test]
    fn test_request_id_echoed_byte_for_byte() {
        let raw = HeaderValue::from_bytes(b"id-\xfe\xff").unwrap();
        let request = axum::http::Request::builder()
            .uri("/")
            .header(X_REQUEST_ID, raw.clone())
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&request);

        let mut response = Response::new(Body::empty());
        RequestIdStage.apply(&ctx, &mut response);
        assert_eq!(response.headers()[X_REQUEST_ID], raw);
    }

    #[test]
    fn test_no_rate_limit_headers_without_status() {
        let mut response = Response::new(Body::empty());
        RateLimitHeaderStage.apply(&ctx(), &mut response);
        assert!(response.headers().get(RATELIMIT_LIMIT).is_none());
    }

    async fn through_rejections(handler_status: StatusCode, json: bool) -> Response {
        use axum::{middleware, routing::get, Extension, Router};
        use tower::ServiceExt;

        let status = RateLimitStatus {
            allowed: true,
            limit: 5,
            remaining: 4,
            reset_after: Duration::from_secs(1),
        };
        let app = Router::new()
            .route(
                "/",
                get(move || async move {
                    if json {
                        (handler_status, Extension(status), axum::Json(serde_json::json!({}))).into_response()
                    } else {
                        (handler_status, Extension(status), "length limit exceeded").into_response()
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(64usize, structured_rejections));

        app.oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_plain_413_rendered_as_json() {
        let response = through_rejections(StatusCode::PAYLOAD_TOO_LARGE, false).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.extensions().get::<RateLimitStatus>().is_some());

        let body = body_json(response).await;
        assert_eq!(body["error"], "Request body exceeds 64 bytes");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_plain_408_rendered_as_json() {
        let response = through_rejections(StatusCode::REQUEST_TIMEOUT, false).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body_json(response).await["error"], "Request timed out");
    }

    #[tokio::test]
    async fn test_other_responses_untouched() {
        let response = through_rejections(StatusCode::PAYLOAD_TOO_LARGE, true).await;
        assert_eq!(body_json(response).await, serde_json::json!({}));

        let response = through_rejections(StatusCode::IM_A_TEAPOT, false).await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"length limit exceeded");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = now_iso8601();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
