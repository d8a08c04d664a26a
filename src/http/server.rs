//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared, read-only security engine once at startup
//! - Create the Axum router with every route and middleware layer
//! - Bind to a listener and serve until shutdown is triggered
//! - Sweep expired rate-limit windows in the background

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::DefaultBodyLimit, middleware, response::IntoResponse, response::Response, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::SetRequestIdLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{validate_config, AppConfig, ConfigError};
use crate::error::{ApiError, StartupError};
use crate::http::request::{IdentityExtractor, RequestUuid};
use crate::http::response::{response_policy_middleware, structured_rejections, ResponsePolicy};
use crate::lifecycle::ShutdownSignal;
use crate::routes;
use crate::security::cors::cors_layer;
use crate::security::rate_limit::{rate_limit_middleware, RateLimitState};
use crate::security::{RateLimiter, SecurityEngine};
use crate::validation::{sanitize_inputs, SanitizeState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: SecurityEngine,
    pub limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// HTTP server for the secured API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Validate the configuration, compile signatures and assemble the
    /// router. Any error here must abort startup.
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let engine = SecurityEngine::new(&config.headers)?;
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit, config.environment));

        tracing::info!(
            environment = %config.environment,
            rate_limit = limiter.limit(),
            window_secs = limiter.window().as_secs(),
            "Security engine initialized"
        );

        let state = AppState {
            config: Arc::new(config),
            engine,
            limiter,
            started_at: Instant::now(),
        };

        let router = Self::build_router(state.clone())?;
        Ok(Self { router, state })
    }

    fn build_router(state: AppState) -> Result<Router, StartupError> {
        let routes = routes::router(state.clone());
        Self::with_layers(routes, &state)
    }

    /// Wrap `routes` in the full middleware stack.
    ///
    /// Layers added later wrap earlier ones, so requests pass through them
    /// bottom-up: tracing, request ID, response policy, panic recovery,
    /// CORS, compression, rejection rendering, timeout, rate limiting, body
    /// limit, sanitization.
    #[allow(deprecated)]
    pub fn with_layers(routes: Router, state: &AppState) -> Result<Router, StartupError> {
        let config = state.config.clone();
        let max_body_bytes = config.listener.max_body_bytes;
        let identity = IdentityExtractor::from_config(&config.rate_limit);

        let sanitize = SanitizeState::new(state.engine.sanitizer.clone(), max_body_bytes);
        let policy = ResponsePolicy::standard(state.engine.headers.clone(), identity.clone());
        let rate_limit = RateLimitState {
            limiter: state.limiter.clone(),
            identity,
        };
        let expose = !config.environment.is_production();

        let router = routes
            .layer(middleware::from_fn_with_state(sanitize, sanitize_inputs))
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(RequestBodyLimitLayer::new(max_body_bytes));

        let router = if config.rate_limit.enabled {
            router.layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware))
        } else {
            tracing::warn!("Rate limiting disabled by configuration");
            router
        };

        Ok(router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(max_body_bytes, structured_rejections))
            .layer(CompressionLayer::new())
            .layer(cors_layer(&config.cors, config.environment)?)
            .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
                panic_response(err, expose)
            }))
            .layer(middleware::from_fn_with_state(policy, response_policy_middleware))
            .layer(SetRequestIdLayer::x_request_id(RequestUuid))
            .layer(TraceLayer::new_for_http()))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = spawn_sweeper(
            self.state.limiter.clone(),
            Duration::from_secs(self.state.config.rate_limit.cleanup_interval_secs),
            shutdown.clone(),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.recv())
            .await?;

        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Rate window sweeper ended abnormally");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let purged = limiter.purge_expired();
                    if purged > 0 {
                        tracing::debug!(
                            purged,
                            tracked = limiter.tracked_clients(),
                            "Swept expired rate windows"
                        );
                    }
                }
            }
        }
    })
}

/// Structured 500 for a panicking handler. The panic message is only
/// exposed outside production.
fn panic_response(err: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %message, "Handler panicked");
    ApiError::Internal { message, expose }.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_message_exposed_outside_production() {
        let response = panic_response(Box::new("boom"), true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "boom");
    }

    #[tokio::test]
    async fn test_panic_message_hidden_in_production() {
        let response = panic_response(Box::new(String::from("secret detail")), false);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_ne!(body["message"], "secret detail");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.window_ms = 0;
        assert!(matches!(
            HttpServer::new(config),
            Err(StartupError::Config(ConfigError::Validation(_)))
        ));
    }
}
