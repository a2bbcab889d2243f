//! `/v1/users` handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::data::permissions::MOVIES_READ;
use crate::data::tokens::validate_token_plaintext;
use crate::data::users::{validate_user, EMAIL_CONSTRAINT};
use crate::data::{DataError, Password, Scope, User};
use crate::http::request::JsonBody;
use crate::http::response::{envelope, ApiError};
use crate::http::server::AppState;
use crate::mailer::{send_with_retry, RetryPolicy, WelcomeEmail};
use crate::validation::Validator;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterUserInput {
    name: String,
    email: String,
    password: String,
}

/// Create an inactive account, grant read access and mail out an
/// activation token. Mail goes out in the background; the response does
/// not wait for it.
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterUserInput>,
) -> Result<Response, ApiError> {
    let password = Password::from_plaintext(&input.password)
        .await
        .map_err(ApiError::internal)?;
    let user = User::new(input.name, input.email, password);

    let mut v = Validator::new();
    validate_user(&mut v, &user);
    v.finish()?;

    let user = match state.models.users.insert(user).await {
        Ok(user) => user,
        Err(DataError::DuplicateKey(constraint)) if constraint == EMAIL_CONSTRAINT => {
            return Err(ApiError::field(
                "email",
                "a user with this email address already exists",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    state
        .models
        .permissions
        .add_for_user(user.id, &[MOVIES_READ])
        .await?;

    let token = state
        .models
        .tokens
        .new_token(user.id, state.config.tokens.activation_ttl(), Scope::Activation)
        .await?;

    let email = WelcomeEmail {
        user_id: user.id,
        activation_token: &token.plaintext,
    }
    .render(&user.email);
    let mailer = state.mailer.clone();
    let policy = RetryPolicy::from(&state.config.mailer);
    state.jobs.spawn("welcome_email", async move {
        send_with_retry(mailer.as_ref(), &email, policy).await
    });

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::ACCEPTED, envelope("user", &user)).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivateUserInput {
    token: String,
}

pub async fn activate_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ActivateUserInput>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &input.token);
    v.finish()?;

    let mut user = match state
        .models
        .users
        .get_for_token(Scope::Activation, &input.token)
        .await
    {
        Ok(user) => user,
        Err(DataError::RecordNotFound) => {
            return Err(ApiError::field("token", "invalid or expired activation token"));
        }
        Err(e) => return Err(e.into()),
    };

    user.activated = true;
    state.models.users.update(&mut user).await?;

    state
        .models
        .tokens
        .delete_all_for_user(Scope::Activation, user.id)
        .await?;

    tracing::info!(user_id = user.id, "User activated");
    Ok(envelope("user", &user).into_response())
}
