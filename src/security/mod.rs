//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client admission)
//!     → headers.rs / cors.rs (response policy)
//!     → sanitizer.rs (via validation::sanitize, body + query rewrite)
//!     → Pass to routing
//!
//! Inspection endpoints:
//!     → classifier.rs (patterns.rs signatures)
//!     → status.rs (self-test report)
//! ```
//!
//! # Design Decisions
//! - Signatures and header policy are built once and shared read-only
//! - Classification never aborts a request; it yields booleans
//! - The rate limiter holds the only mutable shared state

pub mod classifier;
pub mod cors;
pub mod headers;
pub mod patterns;
pub mod rate_limit;
pub mod sanitizer;
pub mod status;

use std::sync::Arc;

pub use classifier::{Classification, Classifier};
pub use headers::SecurityHeaders;
pub use patterns::{PatternRegistry, ThreatCategory};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use sanitizer::Sanitizer;

use crate::config::HeaderPolicyConfig;
use crate::error::StartupError;

/// The read-only detection and transformation engine shared by every
/// request.
#[derive(Debug, Clone)]
pub struct SecurityEngine {
    pub classifier: Classifier,
    pub sanitizer: Arc<Sanitizer>,
    pub headers: Arc<SecurityHeaders>,
}

impl SecurityEngine {
    /// Compile signatures and build the header policy. Any failure here must
    /// stop the service from starting.
    pub fn new(header_policy: &HeaderPolicyConfig) -> Result<Self, StartupError> {
        let registry = Arc::new(PatternRegistry::compile()?);
        Ok(Self {
            classifier: Classifier::new(registry),
            sanitizer: Arc::new(Sanitizer::new()?),
            headers: Arc::new(SecurityHeaders::from_config(header_policy)?),
        })
    }
}
