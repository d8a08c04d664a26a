//! Security response headers.
//!
//! # Responsibilities
//! - Build the fixed security header set once from configuration
//! - Attach it to every response (success, rejection, 404, 5xx)
//! - Report header compliance for the status endpoint
//!
//! # Design Decisions
//! - Header values are validated at startup; a bad value is fatal
//! - Existing headers set by a handler are overwritten, never duplicated

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::config::{CspDirective, HeaderPolicyConfig};
use crate::error::StartupError;

/// Headers the status report expects every response to carry.
pub const REQUIRED_HEADERS: [&str; 4] = [
    "x-content-type-options",
    "x-frame-options",
    "x-xss-protection",
    "strict-transport-security",
];

/// Process-wide, read-only header policy.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn from_config(config: &HeaderPolicyConfig) -> Result<Self, StartupError> {
        let value = |v: String| {
            HeaderValue::try_from(v.as_str())
                .map_err(|_| StartupError::Header(format!("'{}' is not a valid header value", v)))
        };

        let hsts = format!(
            "max-age={}; includeSubDomains; preload",
            config.hsts_max_age_secs
        );

        let headers = vec![
            (
                header::CONTENT_SECURITY_POLICY,
                value(content_security_policy(&config.content_security_policy))?,
            ),
            (header::STRICT_TRANSPORT_SECURITY, value(hsts)?),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            (
                HeaderName::from_static("x-powered-by"),
                value(config.powered_by.clone())?,
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            ),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
            (header::EXPIRES, HeaderValue::from_static("0")),
        ];

        Ok(Self { headers })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(k, v)| (k, v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.as_str().eq_ignore_ascii_case(name))
    }

    /// Write the policy into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn compliance(&self) -> HeaderCompliance {
        let missing: Vec<&'static str> = REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|h| !self.contains(h))
            .collect();
        let present = REQUIRED_HEADERS.len() - missing.len();

        HeaderCompliance {
            required: REQUIRED_HEADERS.len(),
            present,
            compliance: (present * 100 + REQUIRED_HEADERS.len() / 2) / REQUIRED_HEADERS.len(),
            missing,
        }
    }
}

/// Coverage of [`REQUIRED_HEADERS`] by the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCompliance {
    pub required: usize,
    pub present: usize,
    pub missing: Vec<&'static str>,
    /// Percentage, rounded.
    pub compliance: usize,
}

/// Render directives as `name src src;name src`.
pub fn content_security_policy(directives: &[CspDirective]) -> String {
    directives
        .iter()
        .map(|d| {
            if d.sources.is_empty() {
                d.name.clone()
            } else {
                format!("{} {}", d.name, d.sources.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
