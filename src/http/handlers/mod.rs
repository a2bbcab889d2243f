//! Endpoint handlers.

pub mod healthcheck;
pub mod movies;
pub mod tokens;
pub mod users;

use axum::http::Method;

use crate::http::response::ApiError;

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
