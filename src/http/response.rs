//! Response envelopes and the error → status mapping.
//!
//! Every body is a JSON object: successes wrap their payload under a named
//! key, failures under `"error"`. Business outcomes map to 4xx without
//! logging; infrastructure failures are logged at error level and answered
//! with a generic 500 so internals never leak.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::data::DataError;
use crate::security::auth::{AccessError, AuthError};
use crate::validation::FieldErrors;

pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Wrap `value` as `{"<key>": value}`.
pub fn envelope<T: Serialize>(key: &str, value: T) -> Json<Value> {
    let mut map = serde_json::Map::new();
    map.insert(
        key.to_string(),
        serde_json::to_value(value).unwrap_or(Value::Null),
    );
    Json(Value::Object(map))
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    FailedValidation(FieldErrors),
    NotFound,
    MethodNotAllowed(Method),
    EditConflict,
    RateLimitExceeded,
    InvalidCredentials,
    InvalidAuthenticationToken,
    AuthenticationRequired,
    InactiveAccount,
    NotPermitted,
    PayloadTooLarge(usize),
    /// Logged, then reported as an opaque 500.
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    /// Single-field validation failure.
    pub fn field(key: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(key.to_string(), message.to_string());
        ApiError::FailedValidation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidAuthenticationToken => {
                StatusCode::BAD_REQUEST
            }
            ApiError::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidCredentials | ApiError::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InactiveAccount | ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> Value {
        match self {
            ApiError::BadRequest(msg) => json!(msg),
            ApiError::FailedValidation(errors) => json!(errors),
            ApiError::NotFound => json!("the requested resource could not be found"),
            ApiError::MethodNotAllowed(method) => {
                json!(format!("the {method} method is not supported for this resource"))
            }
            ApiError::EditConflict => {
                json!("unable to update the record due to an edit conflict, please try again")
            }
            ApiError::RateLimitExceeded => json!("rate limit exceeded"),
            ApiError::InvalidCredentials => json!("invalid authentication credentials"),
            ApiError::InvalidAuthenticationToken => {
                json!("invalid or missing authentication token")
            }
            ApiError::AuthenticationRequired => {
                json!("you must be authenticated to access this resource")
            }
            ApiError::InactiveAccount => {
                json!("your user account must be activated to access this resource")
            }
            ApiError::NotPermitted => json!(
                "your user account doesn't have the necessary permissions to access this resource"
            ),
            ApiError::PayloadTooLarge(limit) => {
                json!(format!("body must not be larger than {limit} bytes"))
            }
            ApiError::Internal(_) => json!(SERVER_ERROR_MESSAGE),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref detail) = self {
            // Emitted inside the request span, which carries method and uri.
            tracing::error!(error = %detail, "Request failed");
        }

        let mut response = (self.status(), envelope("error", self.message())).into_response();
        if matches!(self, ApiError::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::RecordNotFound => ApiError::NotFound,
            DataError::EditConflict => ApiError::EditConflict,
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentialFormat | AuthError::InvalidToken => {
                ApiError::InvalidAuthenticationToken
            }
            AuthError::LookupFailure(e) => ApiError::internal(e),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::AuthenticationRequired => ApiError::AuthenticationRequired,
            AccessError::NotActivated => ApiError::InactiveAccount,
            AccessError::NotPermitted => ApiError::NotPermitted,
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::FailedValidation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak() {
        let response = ApiError::internal("storage timed out after 3000ms").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": SERVER_ERROR_MESSAGE})
        );
    }

    #[tokio::test]
    async fn invalid_token_carries_challenge() {
        let response = ApiError::from(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(
            body_json(response).await,
            json!({"error": "invalid or missing authentication token"})
        );
    }

    #[tokio::test]
    async fn validation_errors_are_keyed_by_field() {
        let response = ApiError::field("email", "must be provided").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({"error": {"email": "must be provided"}})
        );
    }

    #[test]
    fn data_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(DataError::RecordNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DataError::EditConflict).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DataError::DuplicateKey("users_email_key".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
