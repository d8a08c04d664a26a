//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.
//! Settings whose sensible value depends on the deployment environment are
//! `Option`s resolved through the `*_for` accessors.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment.
    pub environment: Environment,

    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin resource sharing policy.
    pub cors: CorsConfig,

    /// Security response header policy.
    pub headers: HeaderPolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Health probe settings.
    pub health: HealthConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Maximum requests per client per window.
    /// Defaults to 100 in production and 1000 elsewhere.
    pub max_requests: Option<u32>,

    /// Header carrying the client identity when running behind a trusted
    /// proxy (e.g. "x-forwarded-for"). When unset only the socket address
    /// is used.
    pub identity_header: Option<String>,

    /// Interval between sweeps of expired client windows, in seconds.
    pub cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn max_requests_for(&self, environment: Environment) -> u32 {
        self.max_requests.unwrap_or(if environment.is_production() {
            100
        } else {
            1000
        })
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000, // 15 minutes
            max_requests: None,
            identity_header: None,
            cleanup_interval_secs: 60,
        }
    }
}

/// CORS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. Defaults depend on the environment.
    pub allowed_origins: Option<Vec<String>>,

    /// Whether credentials (cookies, auth headers) are allowed.
    pub allow_credentials: bool,

    /// Allowed request methods.
    pub allowed_methods: Vec<String>,

    /// Allowed request headers.
    pub allowed_headers: Vec<String>,
}

impl CorsConfig {
    pub fn origins_for(&self, environment: Environment) -> Vec<String> {
        match &self.allowed_origins {
            Some(origins) => origins.clone(),
            None if environment.is_production() => {
                vec!["https://secure-api.azurewebsites.net".to_string()]
            }
            None => vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: None,
            allow_credentials: true,
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: ["content-type", "authorization", "x-requested-with"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

/// A single content-security-policy directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CspDirective {
    /// Directive name (e.g. "default-src").
    pub name: String,

    /// Source expressions (e.g. "'self'").
    pub sources: Vec<String>,
}

impl CspDirective {
    fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Security response header policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Value of the `x-powered-by` header.
    pub powered_by: String,

    /// HSTS max-age in seconds.
    pub hsts_max_age_secs: u64,

    /// Content-Security-Policy directives, in emission order.
    pub content_security_policy: Vec<CspDirective>,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            powered_by: "secure-api".to_string(),
            hsts_max_age_secs: 31_536_000, // one year
            content_security_policy: vec![
                CspDirective::new("default-src", &["'self'"]),
                CspDirective::new("style-src", &["'self'", "'unsafe-inline'"]),
                CspDirective::new("script-src", &["'self'"]),
                CspDirective::new("img-src", &["'self'", "data:", "https:"]),
                CspDirective::new("connect-src", &["'self'"]),
                CspDirective::new("font-src", &["'self'"]),
                CspDirective::new("object-src", &["'none'"]),
                CspDirective::new("media-src", &["'self'"]),
                CspDirective::new("frame-src", &["'none'"]),
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds after startup before `/ready` reports ready.
    pub readiness_delay_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            readiness_delay_secs: 5,
        }
    }
}
