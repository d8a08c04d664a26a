//! Structured logging.
//!
//! # Design Decisions
//! - JSON lines in production, human-readable output elsewhere
//! - `RUST_LOG` wins over the configured level when set
//! - Audit lines use the `secure_api::audit` target so they can be
//!   filtered independently

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, ObservabilityConfig};

/// Default directive set for a configured level.
pub fn default_directives(level: &str) -> String {
    format!("secure_api={level},tower_http={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &ObservabilityConfig, environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if environment.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
