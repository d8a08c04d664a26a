//! Threat classification.
//!
//! Pure predicates over the [`PatternRegistry`]. The two categories are
//! evaluated independently and each short-circuits on its first match, so
//! signature order never changes a verdict. A rejecting match emits a
//! diagnostic log event and a metric; neither affects the returned value.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::observability::metrics;
use crate::security::patterns::{PatternRegistry, ThreatCategory};

/// Longest snippet of offending input written to the logs.
const SNIPPET_MAX_CHARS: usize = 100;

/// Known-malicious XSS vectors the status report checks against.
pub const XSS_SELF_TEST_VECTORS: &[&str] = &[
    r#"<script>alert("xss")</script>"#,
    r#"javascript:alert("xss")"#,
    r#"<img src="x" onerror="alert(1)">"#,
];

/// Known-malicious SQL-injection vectors the status report checks against.
pub const SQL_SELF_TEST_VECTORS: &[&str] = &[
    "'; DROP TABLE users; --",
    "1' OR '1'='1",
    "UNION SELECT * FROM users",
];

/// Per-input verdict. Recomputed on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_xss_match: bool,
    pub is_sql_match: bool,
    pub is_safe: bool,
}

/// Classifier over a shared signature registry.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: Arc<PatternRegistry>,
}

impl Classifier {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// True iff any XSS signature matches.
    pub fn detect_xss(&self, input: &str) -> bool {
        self.registry.first_match(ThreatCategory::Xss, input).is_some()
    }

    /// True iff any SQL-injection signature matches.
    pub fn detect_sql_injection(&self, input: &str) -> bool {
        self.registry
            .first_match(ThreatCategory::SqlInjection, input)
            .is_some()
    }

    /// Allow-list by exclusion: an input passes only when it is non-empty
    /// and matches no known signature.
    pub fn validate_input(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }

        for category in [ThreatCategory::SqlInjection, ThreatCategory::Xss] {
            if let Some(pattern) = self.registry.first_match(category, input) {
                report_threat(category, pattern.name, input);
                return false;
            }
        }

        true
    }

    /// [`validate_input`](Self::validate_input) over an untyped value.
    /// Anything but a string is rejected without inspection.
    pub fn validate_value(&self, input: &Value) -> bool {
        input.as_str().is_some_and(|s| self.validate_input(s))
    }

    /// Full verdict for a string.
    pub fn classify(&self, input: &str) -> Classification {
        Classification {
            is_xss_match: self.detect_xss(input),
            is_sql_match: self.detect_sql_injection(input),
            is_safe: self.validate_input(input),
        }
    }

    /// Full verdict for an untyped value. Non-strings and null never match
    /// and are never safe.
    pub fn classify_value(&self, input: &Value) -> Classification {
        match input.as_str() {
            Some(s) => self.classify(s),
            None => Classification {
                is_xss_match: false,
                is_sql_match: false,
                is_safe: false,
            },
        }
    }

    /// True when every canned XSS vector is rejected.
    pub fn xss_self_test(&self) -> bool {
        XSS_SELF_TEST_VECTORS.iter().all(|v| !self.validate_input(v))
    }

    /// True when every canned SQL-injection vector is rejected.
    pub fn sql_injection_self_test(&self) -> bool {
        SQL_SELF_TEST_VECTORS.iter().all(|v| !self.validate_input(v))
    }
}

fn report_threat(category: ThreatCategory, signature: &str, input: &str) {
    let snippet: String = input.chars().take(SNIPPET_MAX_CHARS).collect();
    tracing::warn!(
        category = %category,
        signature,
        snippet = %snippet,
        "Threat signature matched"
    );
    metrics::record_threat(category);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(PatternRegistry::compile().unwrap()))
    }

    #[test_case("<script>alert(1)</script>" ; "script block")]
    #[test_case("javascript:alert(1)" ; "javascript scheme")]
    #[test_case("<img onerror=alert(1)>" ; "event handler")]
    #[test_case("'; DROP TABLE users; --" ; "drop table")]
    #[test_case("1' OR '1'='1" ; "tautology")]
    #[test_case("UNION SELECT * FROM users" ; "union select")]
    fn test_malicious_input_is_rejected(input: &str) {
        assert!(!classifier().validate_input(input));
    }

    #[test_case("Hello World")]
    #[test_case("user@example.com")]
    #[test_case("https://example.com")]
    #[test_case("select a movie")]
    #[test_case("insert coin")]
    fn test_benign_input_passes(input: &str) {
        let c = classifier();
        assert!(c.validate_input(input));
        assert!(!c.detect_xss(input));
        assert!(!c.detect_sql_injection(input));
    }

    #[test_case("admin'--")]
    #[test_case("1; DELETE FROM users")]
    fn test_detects_sql_injection(input: &str) {
        assert!(classifier().detect_sql_injection(input));
    }

    #[test]
    fn test_detects_dangerous_tags() {
        let c = classifier();
        assert!(c.detect_xss(r#"<iframe src="javascript:alert(1)"></iframe>"#));
        assert!(c.detect_xss("<EMBED src=x>"));
        assert!(c.detect_xss("width: expression (alert(1))"));
        assert!(c.detect_xss("VBScript:msgbox"));
    }

    #[test]
    fn test_empty_and_non_string_input() {
        let c = classifier();
        assert!(!c.validate_input(""));
        assert!(!c.validate_value(&Value::Null));
        assert!(!c.validate_value(&serde_json::json!(42)));
        assert!(c.validate_value(&serde_json::json!("plain")));

        let verdict = c.classify_value(&serde_json::json!(["<script>"]));
        assert!(!verdict.is_xss_match);
        assert!(!verdict.is_sql_match);
        assert!(!verdict.is_safe);
    }

    #[test]
    fn test_classify_reports_categories_independently() {
        let verdict = classifier().classify("<script>x</script>' OR 1=1");
        assert_eq!(
            verdict,
            Classification {
                is_xss_match: true,
                is_sql_match: true,
                is_safe: false,
            }
        );
    }

    #[test]
    fn test_self_tests_pass() {
        let c = classifier();
        assert!(c.xss_self_test());
        assert!(c.sql_injection_self_test());
    }
}
