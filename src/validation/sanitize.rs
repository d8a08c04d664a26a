//! Pre-handler input sanitization.
//!
//! # Responsibilities
//! - Rewrite every top-level string in the query and in JSON-object or
//!   form-encoded bodies through the [`Sanitizer`]
//! - Keep key order and every non-string value untouched
//! - Record the payload as submitted in [`SubmittedInput`] for inspection
//!   endpoints and declared-rule validation
//!
//! # Design Decisions
//! - Runs for every route, after rate-limit admission
//! - Bodies of any other content type, and JSON that is not an object,
//!   pass through untouched for the handler to reject
//! - Only a body over the size limit is a 413; any other read failure is
//!   a 400

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        FromRequest, Request, State,
    },
    http::{header, uri::PathAndQuery, HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::ApiError;
use crate::security::Sanitizer;

/// The request payload exactly as the client sent it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmittedInput {
    /// Top-level body fields (JSON object or form fields).
    pub body: Map<String, Value>,
    /// Query pairs in order of appearance.
    pub query: Vec<(String, String)>,
}

/// State for the sanitization middleware.
#[derive(Clone)]
pub struct SanitizeState {
    sanitizer: Arc<Sanitizer>,
    max_body_bytes: usize,
}

impl SanitizeState {
    pub fn new(sanitizer: Arc<Sanitizer>, max_body_bytes: usize) -> Self {
        Self {
            sanitizer,
            max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let essence = content_type.split(';').next().unwrap_or_default().trim();

        if essence == "application/json" || essence.ends_with("+json") {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Sanitize query and body before the request reaches its handler.
pub async fn sanitize_inputs(
    State(state): State<SanitizeState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut submitted = SubmittedInput::default();

    // 1. Query string
    if let Some(query) = parts.uri.query() {
        let pairs = parse_pairs(query.as_bytes());
        let cleaned = sanitize_pairs(&state.sanitizer, &pairs);
        if cleaned != pairs {
            match with_query(&parts.uri, &encode_pairs(&cleaned)) {
                Some(uri) => parts.uri = uri,
                None => tracing::warn!(uri = %parts.uri, "Could not rebuild sanitized query"),
            }
        }
        submitted.query = pairs;
    }

    // 2. Body
    let kind = BodyKind::from_headers(&parts.headers);
    let body = if kind == BodyKind::Other {
        body
    } else {
        let buffered = Bytes::from_request(Request::from_parts(parts.clone(), body), &()).await;
        let bytes = match buffered {
            Ok(bytes) => bytes,
            Err(rejection) => return buffer_failure(rejection, state.max_body_bytes).into_response(),
        };

        let rewritten = match kind {
            BodyKind::Json => sanitize_json(&state.sanitizer, &bytes, &mut submitted),
            _ => sanitize_form(&state.sanitizer, &bytes, &mut submitted),
        };

        match rewritten {
            Some(new_body) => {
                parts
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(new_body.len()));
                Body::from(new_body)
            }
            None => Body::from(bytes),
        }
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(submitted);
    next.run(request).await
}

fn buffer_failure(rejection: BytesRejection, limit: usize) -> ApiError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            ApiError::PayloadTooLarge { limit }
        }
        other => {
            tracing::debug!(error = %other.body_text(), "Failed to buffer request body");
            ApiError::UnreadableBody
        }
    }
}

/// Returns the rewritten body when any string changed.
fn sanitize_json(sanitizer: &Sanitizer, bytes: &Bytes, submitted: &mut SubmittedInput) -> Option<Vec<u8>> {
    let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(bytes) else {
        return None;
    };
    submitted.body = fields.clone();

    let mut changed = false;
    for value in fields.values_mut() {
        if let Value::String(s) = value {
            let clean = sanitizer.sanitize(s);
            if clean != *s {
                *s = clean;
                changed = true;
            }
        }
    }

    if !changed {
        return None;
    }
    serde_json::to_vec(&Value::Object(fields)).ok()
}

fn sanitize_form(sanitizer: &Sanitizer, bytes: &Bytes, submitted: &mut SubmittedInput) -> Option<Vec<u8>> {
    let pairs = parse_pairs(bytes);
    submitted.body = pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    let cleaned = sanitize_pairs(sanitizer, &pairs);
    (cleaned != pairs).then(|| encode_pairs(&cleaned).into_bytes())
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}

fn sanitize_pairs(sanitizer: &Sanitizer, pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), sanitizer.sanitize(v)))
        .collect()
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn with_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new().unwrap()
    }

    #[test]
    fn test_json_strings_rewritten_in_order() {
        let mut submitted = SubmittedInput::default();
        let raw = Bytes::from(r#"{"z":" <b>hi</b> ","n":5,"a":"ok","nested":{"x":"<i>"}}"#);

        let out = sanitize_json(&sanitizer(), &raw, &mut submitted).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"z":"&lt;b&gt;hi&lt;/b&gt;","n":5,"a":"ok","nested":{"x":"<i>"}}"#
        );
        assert_eq!(submitted.body["z"], json!(" <b>hi</b> "));
    }

    #[test]
    fn test_clean_json_is_not_rewritten() {
        let mut submitted = SubmittedInput::default();
        let raw = Bytes::from(r#"{"data":"hello"}"#);
        assert!(sanitize_json(&sanitizer(), &raw, &mut submitted).is_none());
        assert_eq!(submitted.body["data"], json!("hello"));
    }

    #[test]
    fn test_non_object_json_passes_through() {
        let mut submitted = SubmittedInput::default();
        let raw = Bytes::from(r#"["<script>x</script>"]"#);
        assert!(sanitize_json(&sanitizer(), &raw, &mut submitted).is_none());
        assert!(submitted.body.is_empty());
    }

    #[test]
    fn test_form_fields_rewritten() {
        let mut submitted = SubmittedInput::default();
        let raw = Bytes::from("name=%3Cscript%3Ealert(1)%3C%2Fscript%3EBob&age=3");
        let out = sanitize_form(&sanitizer(), &raw, &mut submitted).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "name=Bob&age=3");
        assert_eq!(submitted.body["age"], json!("3"));
    }

    #[test]
    fn test_query_rebuild_keeps_path() {
        let uri: Uri = "/api/demo?q=1".parse().unwrap();
        let rebuilt = with_query(&uri, "q=2&r=3").unwrap();
        assert_eq!(rebuilt.path(), "/api/demo");
        assert_eq!(rebuilt.query(), Some("q=2&r=3"));
    }

    #[test]
    fn test_body_kind_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Json);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Other);
    }
}
