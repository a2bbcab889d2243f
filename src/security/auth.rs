//! Bearer token authentication.
//!
//! Resolves the `Authorization` header into a [`Principal`]. A missing
//! header is not an error: the request proceeds anonymously and the
//! per-route gates decide whether that is acceptable.

use std::sync::Arc;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::data::tokens::{is_well_formed, Scope};
use crate::data::{DataError, PermissionModel, Permissions, UserModel};

/// The user a request acts on behalf of.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub permissions: Permissions,
}

/// Identity attached to every request that passed authentication.
#[derive(Debug, Clone, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(Arc<AuthenticatedUser>),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(&**user),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Header present but not `Bearer <token>`.
    #[error("malformed authorization header")]
    InvalidCredentialFormat,

    /// Token malformed, unknown, expired or of another scope.
    #[error("invalid or expired authentication token")]
    InvalidToken,

    #[error("token lookup failed: {0}")]
    LookupFailure(DataError),
}

/// Why a gate refused a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("account not activated")]
    NotActivated,

    #[error("missing permission")]
    NotPermitted,
}

#[derive(Clone)]
pub struct Authenticator {
    users: UserModel,
    permissions: PermissionModel,
}

impl Authenticator {
    pub fn new(users: UserModel, permissions: PermissionModel) -> Self {
        Self { users, permissions }
    }

    pub async fn resolve(&self, header: Option<&HeaderValue>) -> Result<Principal, AuthError> {
        let Some(header) = header else {
            return Ok(Principal::Anonymous);
        };

        let token = parse_bearer(header)?;
        if !is_well_formed(token) {
            return Err(AuthError::InvalidToken);
        }

        let user = match self.users.get_for_token(Scope::Authentication, token).await {
            Ok(user) => user,
            Err(DataError::RecordNotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(AuthError::LookupFailure(e)),
        };
        let permissions = self
            .permissions
            .get_all_for_user(user.id)
            .await
            .map_err(AuthError::LookupFailure)?;

        Ok(Principal::User(Arc::new(AuthenticatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
            activated: user.activated,
            permissions,
        })))
    }
}

fn parse_bearer(header: &HeaderValue) -> Result<&str, AuthError> {
    let value = header
        .to_str()
        .map_err(|_| AuthError::InvalidCredentialFormat)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::InvalidCredentialFormat),
    }
}

pub fn require_authenticated(principal: &Principal) -> Result<&AuthenticatedUser, AccessError> {
    principal.user().ok_or(AccessError::AuthenticationRequired)
}

pub fn require_activated(principal: &Principal) -> Result<&AuthenticatedUser, AccessError> {
    let user = require_authenticated(principal)?;
    if !user.activated {
        return Err(AccessError::NotActivated);
    }
    Ok(user)
}

pub fn require_permission<'a>(
    principal: &'a Principal,
    code: &str,
) -> Result<&'a AuthenticatedUser, AccessError> {
    let user = require_activated(principal)?;
    if !user.permissions.includes(code) {
        return Err(AccessError::NotPermitted);
    }
    Ok(user)
}
