//! `/v1/users/authentication` (login).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::data::users::{validate_email, validate_password_plaintext};
use crate::data::{DataError, Scope};
use crate::http::request::JsonBody;
use crate::http::response::{envelope, ApiError};
use crate::http::server::AppState;
use crate::validation::Validator;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsInput {
    email: String,
    password: String,
}

/// Exchange email and password for an authentication token.
pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CredentialsInput>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    v.finish()?;

    let user = match state.models.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(DataError::RecordNotFound) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    let matches = user
        .password
        .matches(&input.password)
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .models
        .tokens
        .new_token(
            user.id,
            state.config.tokens.authentication_ttl(),
            Scope::Authentication,
        )
        .await?;

    Ok((StatusCode::CREATED, envelope("authentication_token", &token)).into_response())
}
