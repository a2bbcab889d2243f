//! Authentication and authorization middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::security::auth::{self, Authenticator, Principal};

/// Resolve the bearer token into a [`Principal`] stored in the request
/// extensions. Every response varies on `Authorization`.
pub async fn authenticate(
    State(authenticator): State<Authenticator>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request.headers().get(header::AUTHORIZATION).cloned();

    let mut response = match authenticator.resolve(header.as_ref()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Route gate: activated user holding `code`.
pub async fn require_permission(
    State(code): State<&'static str>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .unwrap_or_default();
    auth::require_permission(&principal, code)?;
    Ok(next.run(request).await)
}
