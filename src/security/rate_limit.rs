//! Per-client fixed-window rate limiting.
//!
//! # Design Decisions
//! - One window per client identity, restarted by the first request after
//!   it expires (not a rolling log)
//! - Read-check-increment happens under the map shard lock, so concurrent
//!   bursts from one client are never undercounted
//! - Admission runs before body parsing and sanitization
//! - Expired windows are swept periodically by the server

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::{Environment, RateLimitConfig};
use crate::error::ApiError;
use crate::http::request::{ClientIdentity, IdentityExtractor};
use crate::observability::metrics;

/// Counter for one client identity.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
}

/// Outcome of an admission check, rendered into `ratelimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window restarts.
    pub reset_after: Duration,
}

/// Fixed-window limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig, environment: Environment) -> Self {
        Self::new(config.max_requests_for(environment), config.window())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `client` and decide whether it is admitted.
    pub fn check(&self, client: &str) -> RateLimitStatus {
        self.check_at(client, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock reading.
    pub fn check_at(&self, client: &str, now: Instant) -> RateLimitStatus {
        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(RateWindow {
                window_start: now,
                count: 0,
            });

        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(entry.window_start);
        RateLimitStatus {
            allowed: entry.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients with a live window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// State for the admission middleware.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub identity: IdentityExtractor,
}

/// Admission gate. Rejected requests never reach the inner layers.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = state.identity.extract(&request);
    let status = state.limiter.check(&client);

    if !status.allowed {
        tracing::warn!(client = %client, limit = status.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = ApiError::RateLimited {
            retry_after: status.reset_after,
            window: state.limiter.window(),
        }
        .into_response();
        response.extensions_mut().insert(status);
        return response;
    }

    request.extensions_mut().insert(status);
    request.extensions_mut().insert(ClientIdentity(client));

    let mut response = next.run(request).await;
    response.extensions_mut().insert(status);
    response
}
