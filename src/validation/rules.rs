//! Declared field rules.
//!
//! Routes attach a [`RuleSet`] describing their fields; the pipeline
//! evaluates it generically against the submitted body. Every rule runs,
//! and every failure is reported in declaration order, so one field may
//! appear several times.

use std::sync::{Arc, LazyLock};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::validation::sanitize::SubmittedInput;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Longest address accepted by [`RuleKind::Email`].
const EMAIL_MAX_LEN: usize = 254;

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// The offending value; omitted when the field was absent.
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    pub rejected_value: Option<Value>,
}

/// The check a rule performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Present, not null, not the empty string.
    Required,
    /// Character count within `min..=max`.
    Length { min: usize, max: usize },
    Email,
    /// Absolute http(s) URL with a host.
    Url,
    OneOf(Vec<String>),
    /// Integer ≥ 1, as a number or numeric string.
    PositiveInteger,
}

/// A rule bound to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub field: String,
    pub kind: RuleKind,
    pub message: String,
    /// Skip the rule when the field is absent or null.
    pub optional: bool,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, kind: RuleKind) -> Self {
        let field = field.into();
        let message = default_message(&field, &kind);
        Self {
            field,
            kind,
            message,
            optional: false,
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Required)
    }

    pub fn length(field: impl Into<String>, min: usize, max: usize) -> Self {
        Self::new(field, RuleKind::Length { min, max })
    }

    pub fn email(field: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Email)
    }

    pub fn url(field: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Url)
    }

    pub fn one_of(field: impl Into<String>, allowed: &[&str]) -> Self {
        Self::new(
            field,
            RuleKind::OneOf(allowed.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn positive_integer(field: impl Into<String>) -> Self {
        Self::new(field, RuleKind::PositiveInteger)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Evaluate the rule against a body object.
    pub fn check(&self, body: &Map<String, Value>) -> Option<ValidationError> {
        let value = body.get(&self.field).filter(|v| !v.is_null());
        if value.is_none() && self.optional {
            return None;
        }

        let passed = match value {
            Some(v) => self.kind.accepts(v),
            None => self.kind.accepts_absent(),
        };

        (!passed).then(|| ValidationError {
            field: self.field.clone(),
            message: self.message.clone(),
            rejected_value: body.get(&self.field).cloned(),
        })
    }
}

impl RuleKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            RuleKind::Required => value.as_str().map_or(true, |s| !s.is_empty()),
            RuleKind::PositiveInteger => match value {
                Value::Number(n) => n.as_u64().is_some_and(|n| n >= 1),
                Value::String(s) => s.trim().parse::<u64>().is_ok_and(|n| n >= 1),
                _ => false,
            },
            _ => as_text(value).is_some_and(|text| self.accepts_text(&text)),
        }
    }

    /// Absent fields are judged as the empty string.
    fn accepts_absent(&self) -> bool {
        match self {
            RuleKind::Required | RuleKind::PositiveInteger => false,
            _ => self.accepts_text(""),
        }
    }

    fn accepts_text(&self, text: &str) -> bool {
        match self {
            RuleKind::Required => !text.is_empty(),
            RuleKind::Length { min, max } => {
                let len = text.chars().count();
                len >= *min && len <= *max
            }
            RuleKind::Email => text.len() <= EMAIL_MAX_LEN && EMAIL.is_match(text),
            RuleKind::Url => url::Url::parse(text).is_ok_and(|u| {
                matches!(u.scheme(), "http" | "https") && u.host_str().is_some()
            }),
            RuleKind::OneOf(allowed) => allowed.iter().any(|a| a == text),
            RuleKind::PositiveInteger => text.trim().parse::<u64>().is_ok_and(|n| n >= 1),
        }
    }
}

/// Scalar values as text; arrays and objects have none.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn default_message(field: &str, kind: &RuleKind) -> String {
    match kind {
        RuleKind::Required => format!("{} is required", field),
        RuleKind::Length { min, max } => {
            format!("{} must be between {} and {} characters", field, min, max)
        }
        RuleKind::Email => format!("{} must be a valid email", field),
        RuleKind::Url => format!("{} must be a valid URL", field),
        RuleKind::OneOf(allowed) => format!("{} must be one of: {}", field, allowed.join(", ")),
        RuleKind::PositiveInteger => format!("{} must be a positive integer", field),
    }
}

/// Ordered rules for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Run every rule; collect every failure.
    pub fn validate(&self, body: &Map<String, Value>) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> =
            self.rules.iter().filter_map(|rule| rule.check(body)).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Route-level middleware: reject with 400 before the handler runs when any
/// declared rule fails against the submitted body.
pub async fn enforce_rules(
    State(rules): State<Arc<RuleSet>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = match request.extensions().get::<SubmittedInput>() {
        Some(submitted) => rules.validate(&submitted.body),
        None => rules.validate(&Map::new()),
    };

    if let Err(errors) = outcome {
        tracing::debug!(
            path = %request.uri().path(),
            failures = errors.len(),
            "Declared rules rejected request"
        );
        return ApiError::Validation(errors).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    fn endpoint_rules() -> RuleSet {
        RuleSet::new(vec![
            FieldRule::required("data"),
            FieldRule::length("data", 1, 1000),
            FieldRule::one_of("type", &["text", "email", "url"]).optional(),
        ])
    }

    #[test]
    fn test_missing_field_fails_every_rule_for_it() {
        let errors = endpoint_rules().validate(&Map::new()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.field == "data"));
        assert_eq!(errors[0].message, "data is required");
        assert_eq!(errors[1].message, "data must be between 1 and 1000 characters");
        assert_eq!(errors[0].rejected_value, None);
    }

    #[test]
    fn test_valid_body_passes() {
        let rules = endpoint_rules();
        assert!(rules.validate(&body(json!({"data": "hi", "type": "email"}))).is_ok());
        assert!(rules.validate(&body(json!({"data": "hi"}))).is_ok());
    }

    #[test]
    fn test_rejected_value_is_reported() {
        let errors = endpoint_rules()
            .validate(&body(json!({"data": "x", "type": "html"})))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "type");
        assert_eq!(errors[0].rejected_value, Some(json!("html")));

        let rendered = serde_json::to_value(&errors[0]).unwrap();
        assert_eq!(rendered["value"], "html");
        assert_eq!(rendered["message"], "type must be one of: text, email, url");
    }

    #[test]
    fn test_length_counts_characters() {
        let rule = FieldRule::length("text", 1, 3);
        assert!(rule.check(&body(json!({"text": "ñáé"}))).is_none());
        assert!(rule.check(&body(json!({"text": "abcd"}))).is_some());
        assert!(rule.check(&body(json!({"text": 12}))).is_none());
        assert!(rule.check(&body(json!({"text": ["a"]}))).is_some());
    }

    #[test]
    fn test_format_rules() {
        let email = FieldRule::email("email");
        assert!(email.check(&body(json!({"email": "user@example.com"}))).is_none());
        assert!(email.check(&body(json!({"email": "user@"}))).is_some());

        let url = FieldRule::url("site");
        assert!(url.check(&body(json!({"site": "https://example.com/a"}))).is_none());
        assert!(url.check(&body(json!({"site": "javascript:alert(1)"}))).is_some());

        let id = FieldRule::positive_integer("id").with_message("ID must be a positive integer");
        assert!(id.check(&body(json!({"id": 7}))).is_none());
        assert!(id.check(&body(json!({"id": "7"}))).is_none());
        let err = id.check(&body(json!({"id": 0}))).unwrap();
        assert_eq!(err.message, "ID must be a positive integer");
    }

    #[test]
    fn test_optional_skips_null() {
        let rule = FieldRule::email("email").optional();
        assert!(rule.check(&body(json!({"email": null}))).is_none());
        assert!(rule.check(&body(json!({"email": "nope"}))).is_some());
    }
}
