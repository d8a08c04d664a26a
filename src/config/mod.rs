//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the security core never reads the
//!   process environment itself
//! - All fields have defaults to allow minimal configs
//! - Environment-sensitive values (rate budget, CORS origins) resolve from
//!   the configured environment when not pinned explicitly
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use validation::{validate_config, InvalidSetting};
pub use schema::{
    AppConfig, CorsConfig, CspDirective, Environment, HeaderPolicyConfig, HealthConfig,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, TimeoutConfig,
};
