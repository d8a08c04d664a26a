//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, body limit > 0)
//! - Reject CORS policies the browser would refuse (wildcard + credentials)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<InvalidSetting>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::AppConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    /// Dotted path of the offending setting.
    pub field: String,
    pub reason: String,
}

impl InvalidSetting {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<InvalidSetting>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(InvalidSetting::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(InvalidSetting::new("listener.max_body_bytes", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(InvalidSetting::new("timeouts.request_secs", "must be greater than 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.window_ms == 0 {
        errors.push(InvalidSetting::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if rate_limit.max_requests_for(config.environment) == 0 {
        errors.push(InvalidSetting::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if rate_limit.cleanup_interval_secs == 0 {
        errors.push(InvalidSetting::new(
            "rate_limit.cleanup_interval_secs",
            "must be greater than 0",
        ));
    }
    if let Some(header) = &rate_limit.identity_header {
        if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(InvalidSetting::new(
                "rate_limit.identity_header",
                format!("'{}' is not a valid header name", header),
            ));
        }
    }

    for origin in config.cors.origins_for(config.environment) {
        if origin == "*" && config.cors.allow_credentials {
            errors.push(InvalidSetting::new(
                "cors.allowed_origins",
                "wildcard origin cannot be combined with credentials",
            ));
        } else if HeaderValue::from_str(&origin).is_err() {
            errors.push(InvalidSetting::new(
                "cors.allowed_origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    for (i, directive) in config.headers.content_security_policy.iter().enumerate() {
        if directive.name.trim().is_empty() {
            errors.push(InvalidSetting::new(
                format!("headers.content_security_policy[{}].name", i),
                "must not be empty",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
