//! Secure API: an HTTP service that inspects, sanitizes and classifies
//! untrusted input before it reaches application logic, while enforcing
//! rate limits, security headers and CORS.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod routes;

// Request protection
pub mod security;
pub mod validation;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{ApiError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
