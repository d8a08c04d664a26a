//! Threat signature registry.
//!
//! # Responsibilities
//! - Hold the ordered SQL-injection and XSS signature lists
//! - Compile every signature once, before the first request is accepted
//!
//! # Design Decisions
//! - Immutable after construction; shared read-only via `Arc`
//! - A signature that fails to compile is a startup error, never a
//!   per-request one
//! - All signatures are case-insensitive
//! - The list is fixed and auditable: false negatives for variants not
//!   listed here are expected

use std::fmt;

use regex::Regex;
use serde::Serialize;

/// `<script ...> ... </script>` block, shortest match, across newlines.
pub const SCRIPT_BLOCK: &str = r"(?is)<script\b.*?</script>";
/// Inline event handler attribute such as `onerror=`.
pub const EVENT_HANDLER: &str = r"(?i)on\w+\s*=";
pub const JAVASCRIPT_SCHEME: &str = r"(?i)javascript:";
pub const VBSCRIPT_SCHEME: &str = r"(?i)vbscript:";

/// SQL-injection signatures, in evaluation order.
const SQL_INJECTION_SIGNATURES: &[(&str, &str)] = &[
    // quote and comment markers, raw or percent-encoded
    ("quote_or_comment", r"(?i)(%27)|(')|(--)|(%23)|(#)"),
    // `= ... '` / `= ... --` / `= ... ;`
    ("tautology", r"(?i)((%3D)|(=))[^\n]*((%27)|(')|(--)|(%3B)|(;))"),
    // `'or`
    ("quoted_or", r"(?i)\w*((%27)|('))((%6F)|o|(%4F))((%72)|r|(%52))"),
    ("union_select", r"(?i)union[\s\w]*select"),
    ("select_from", r"(?i)select[\s\w]*from"),
    ("insert_into", r"(?i)insert[\s\w]*into"),
    ("delete_from", r"(?i)delete[\s\w]*from"),
    ("update_set", r"(?i)update[\s\w]*set"),
    ("drop_table", r"(?i)drop[\s\w]*table"),
];

/// Cross-site scripting signatures, in evaluation order.
const XSS_SIGNATURES: &[(&str, &str)] = &[
    ("script_block", SCRIPT_BLOCK),
    ("javascript_scheme", JAVASCRIPT_SCHEME),
    ("event_handler", EVENT_HANDLER),
    ("iframe_tag", r"(?i)<iframe"),
    ("object_tag", r"(?i)<object"),
    ("embed_tag", r"(?i)<embed"),
    ("link_tag", r"(?i)<link"),
    ("meta_tag", r"(?i)<meta"),
    ("css_expression", r"(?i)expression\s*\("),
    ("vbscript_scheme", VBSCRIPT_SCHEME),
];

/// Category a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
}

impl ThreatCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatCategory::SqlInjection => "sql_injection",
            ThreatCategory::Xss => "xss",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled signature tagged with its category.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: &'static str,
    pub category: ThreatCategory,
    regex: Regex,
}

impl Pattern {
    fn compile(
        name: &'static str,
        category: ThreatCategory,
        source: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            category,
            regex: Regex::new(source)?,
        })
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Immutable, ordered signature lists for both threat categories.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    sql_injection: Vec<Pattern>,
    xss: Vec<Pattern>,
}

impl PatternRegistry {
    /// Compile the built-in signature set.
    pub fn compile() -> Result<Self, regex::Error> {
        fn compile_all(
            signatures: &[(&'static str, &str)],
            category: ThreatCategory,
        ) -> Result<Vec<Pattern>, regex::Error> {
            signatures
                .iter()
                .map(|&(name, source)| Pattern::compile(name, category, source))
                .collect()
        }

        let registry = Self {
            sql_injection: compile_all(SQL_INJECTION_SIGNATURES, ThreatCategory::SqlInjection)?,
            xss: compile_all(XSS_SIGNATURES, ThreatCategory::Xss)?,
        };

        tracing::debug!(
            sql_injection = registry.sql_injection.len(),
            xss = registry.xss.len(),
            "Threat signatures compiled"
        );
        Ok(registry)
    }

    pub fn patterns(&self, category: ThreatCategory) -> &[Pattern] {
        match category {
            ThreatCategory::SqlInjection => &self.sql_injection,
            ThreatCategory::Xss => &self.xss,
        }
    }

    /// Total signature count across both categories.
    pub fn len(&self) -> usize {
        self.sql_injection.len() + self.xss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First signature of `category` matching `input`, in registry order.
    pub fn first_match(&self, category: ThreatCategory, input: &str) -> Option<&Pattern> {
        self.patterns(category).iter().find(|p| p.is_match(input))
    }
}
