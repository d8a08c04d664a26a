//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, audit lines)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (JSON in production)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```

pub mod logging;
pub mod metrics;
