//! Validation pipeline.
//!
//! # Data Flow
//! ```text
//! admitted request
//!     → sanitize.rs (rewrite body + query strings, snapshot submitted input)
//!     → [route dispatch]
//!     → rules.rs (route-declared field rules, 400 on any failure)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - The two stages are independent; sanitization never rejects
//! - Rules are data, not code: endpoints declare them, the pipeline
//!   evaluates them without knowing field names

pub mod rules;
pub mod sanitize;

pub use rules::{enforce_rules, FieldRule, RuleKind, RuleSet, ValidationError};
pub use sanitize::{sanitize_inputs, SanitizeState, SubmittedInput};
