//! Request decoding helpers.
//!
//! JSON bodies are decoded strictly (unknown keys rejected, exactly one
//! value) and every decoding failure becomes a 400 that says what was wrong.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::http::response::ApiError;
use crate::validation::Validator;

/// Configured body limit, made visible to extractors.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

/// Strict JSON body extractor.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limit = req.extensions().get::<BodyLimit>().map(|l| l.0);
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(limit.unwrap_or_default())
            } else {
                ApiError::BadRequest(rejection.body_text())
            }
        })?;
        decode_json(&bytes).map(JsonBody)
    }
}

/// Decode a body into `T`, translating serde errors into client messages.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("body must not be empty".into()));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequest(describe_json_error(&e)))
}

fn describe_json_error(e: &serde_json::Error) -> String {
    let raw = e.to_string();
    // serde_json appends " at line L column C"; keep only the message.
    let message = raw
        .rsplit_once(" at line ")
        .map(|(head, _)| head)
        .unwrap_or(&raw);

    match e.classify() {
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Syntax if message.starts_with("trailing characters") => {
            "body must only contain a single JSON value".to_string()
        }
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {}, column {})",
            e.line(),
            e.column()
        ),
        Category::Data => {
            if let Some(rest) = message.strip_prefix("unknown field ") {
                let field = rest.split(',').next().unwrap_or(rest);
                format!("body contains unknown key {field}")
            } else if message.starts_with("invalid type") {
                format!(
                    "body contains incorrect JSON type (at line {}, column {})",
                    e.line(),
                    e.column()
                )
            } else {
                message.to_string()
            }
        }
        Category::Io => message.to_string(),
    }
}

/// Parse a positive id from a path segment. Anything else is a 404.
pub fn read_id_param(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

pub type QueryString = HashMap<String, String>;

pub fn read_string(qs: &QueryString, key: &str, default: &str) -> String {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

/// Comma-separated list; empty entries dropped.
pub fn read_csv(qs: &QueryString, key: &str) -> Vec<String> {
    qs.get(key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Integer parameter; a non-integer records a validation error and yields
/// `default`.
pub fn read_int(qs: &QueryString, key: &str, default: i64, v: &mut Validator) -> i64 {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Input {
        #[allow(dead_code)]
        title: Option<String>,
        #[allow(dead_code)]
        year: Option<i32>,
    }

    fn message(body: &str) -> String {
        match decode_json::<Input>(body.as_bytes()) {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn json_errors_are_descriptive() {
        assert_eq!(message(""), "body must not be empty");
        assert_eq!(message(r#"{"title": "x""#), "body contains badly-formed JSON");
        assert!(message(r#"{"title": }"#).starts_with("body contains badly-formed JSON (at line 1"));
        assert_eq!(message(r#"{"rating": 5}"#), "body contains unknown key `rating`");
        assert!(message(r#"{"year": "1999"}"#).starts_with("body contains incorrect JSON type"));
        assert_eq!(
            message(r#"{"title": "a"} {"title": "b"}"#),
            "body must only contain a single JSON value"
        );
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(read_id_param("12").unwrap(), 12);
        for bad in ["0", "-3", "abc", ""] {
            assert!(matches!(read_id_param(bad), Err(ApiError::NotFound)));
        }
    }

    #[test]
    fn query_helpers() {
        let qs: QueryString = [
            ("genres".to_string(), "drama, ,comedy".to_string()),
            ("page".to_string(), "two".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(read_csv(&qs, "genres"), vec!["drama", "comedy"]);
        assert_eq!(read_string(&qs, "sort", "id"), "id");

        let mut v = Validator::new();
        assert_eq!(read_int(&qs, "page", 1, &mut v), 1);
        assert_eq!(v.errors()["page"], "must be an integer value");
    }
}
