//! Input sanitization.
//!
//! # Steps (fixed order)
//! 1. Remove `<script>...</script>` blocks
//! 2. Remove inline event-handler attributes (`on<word>=`)
//! 3. Remove `javascript:` and `vbscript:` scheme prefixes
//! 4. HTML-escape `& < > " '` (ampersand first)
//! 5. Trim surrounding whitespace
//!
//! # Design Decisions
//! - Single pass. Escaping is not idempotent: sanitizing sanitized output
//!   escapes the entities again. Adversarially nested markers (e.g.
//!   `<scr<script></script>ipt>`) can survive one pass as escaped text.
//! - Non-string values pass through unchanged

use regex::Regex;
use serde_json::Value;

use crate::security::patterns::{EVENT_HANDLER, JAVASCRIPT_SCHEME, SCRIPT_BLOCK, VBSCRIPT_SCHEME};

/// Strips and escapes dangerous substrings.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    removals: Vec<Regex>,
}

impl Sanitizer {
    /// Compile the removal expressions.
    pub fn new() -> Result<Self, regex::Error> {
        let removals = [SCRIPT_BLOCK, EVENT_HANDLER, JAVASCRIPT_SCHEME, VBSCRIPT_SCHEME]
            .iter()
            .map(|source| Regex::new(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { removals })
    }

    /// Sanitize a string.
    pub fn sanitize(&self, input: &str) -> String {
        let mut current = input.to_string();
        for removal in &self.removals {
            current = removal.replace_all(&current, "").into_owned();
        }

        escape_html(&current).trim().to_string()
    }

    /// Sanitize an untyped value. Strings are sanitized; every other value,
    /// null included, is returned unchanged.
    pub fn sanitize_value(&self, input: Value) -> Value {
        match input {
            Value::String(s) => Value::String(self.sanitize(&s)),
            other => other,
        }
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new().unwrap()
    }

    #[test]
    fn test_strips_script_keeps_text() {
        let out = sanitizer().sanitize("<script>alert(1)</script>Hello");
        assert!(!out.contains("<script>"));
        assert!(out.contains("Hello"));
        assert_eq!(out, "Hello");
    }

    #[test]
    fn test_removes_event_handlers() {
        let out = sanitizer().sanitize(r#"<img src="x" onerror="alert(1)">"#);
        assert!(!out.contains("onerror="));
        assert_eq!(out, "&lt;img src=&quot;x&quot; &quot;alert(1)&quot;&gt;");
    }

    #[test]
    fn test_removes_schemes_case_insensitively() {
        let out = sanitizer().sanitize("  JavaScript:go() vbscript:run ");
        assert_eq!(out, "go() run");
    }

    #[test]
    fn test_escapes_ampersand_first() {
        assert_eq!(
            sanitizer().sanitize(r#"Tom & "Jerry" <b>'s</b>"#),
            "Tom &amp; &quot;Jerry&quot; &lt;b&gt;&#x27;s&lt;/b&gt;"
        );
    }

    #[test]
    fn test_second_pass_over_escapes() {
        let s = sanitizer();
        let once = s.sanitize("a & b");
        let twice = s.sanitize(&once);
        assert_eq!(once, "a &amp; b");
        assert_ne!(once, twice);
    }

    #[test]
    fn test_non_strings_pass_through() {
        let s = sanitizer();
        assert_eq!(s.sanitize_value(Value::Null), Value::Null);
        assert_eq!(s.sanitize_value(json!(42)), json!(42));
        assert_eq!(s.sanitize_value(json!({"a": "<b>"})), json!({"a": "<b>"}));
        assert_eq!(s.sanitize_value(json!(" <x> ")), json!("&lt;x&gt;"));
    }
}
