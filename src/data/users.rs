//! User accounts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::tokens::{Scope, TokenModel};
use crate::data::{DataError, OptimisticStore};
use crate::security::password::{self, PasswordError};
use crate::storage::{Engine, Record};
use crate::validation::{email_regex, matches, Validator};

/// Unique constraint on the email column.
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

/// A password hash plus, while a request is handling it, the plaintext it
/// came from (kept only so validation can inspect it).
#[derive(Clone, Default)]
pub struct Password {
    plaintext: Option<String>,
    hash: Option<String>,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("plaintext", &self.plaintext.as_ref().map(|_| "[redacted]"))
            .field("hash", &self.hash.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Password {
    pub async fn from_plaintext(plaintext: &str) -> Result<Self, PasswordError> {
        let hash = password::hash_password_blocking(plaintext.to_string()).await?;
        Ok(Self {
            plaintext: Some(plaintext.to_string()),
            hash: Some(hash),
        })
    }

    pub fn from_hash(hash: String) -> Self {
        Self {
            plaintext: None,
            hash: Some(hash),
        }
    }

    pub fn plaintext(&self) -> Option<&str> {
        self.plaintext.as_deref()
    }

    /// Drop the plaintext, leaving only the hash. Rows are persisted in this form.
    pub fn forget_plaintext(&mut self) {
        self.plaintext = None;
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Compare `candidate` with the stored hash. A user without a hash never matches.
    pub async fn matches(&self, candidate: &str) -> Result<bool, PasswordError> {
        match &self.hash {
            Some(hash) => {
                password::verify_password_blocking(candidate.to_string(), hash.clone()).await
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: Password,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

impl User {
    pub fn new(name: String, email: String, password: Password) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            name,
            email,
            password,
            activated: false,
            version: 0,
        }
    }
}

impl Record for User {
    const UNIQUE_CONSTRAINT: &'static str = EMAIL_CONSTRAINT;

    fn id(&self) -> i64 {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
    fn version(&self) -> i32 {
        self.version
    }
    fn set_version(&mut self, version: i32) {
        self.version = version;
    }
    fn unique_key(&self) -> Option<String> {
        Some(self.email.to_lowercase())
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(
        matches(email, email_regex()),
        "email",
        "must be a valid email address",
    );
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= 8,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= 72,
        "password",
        "must not be more than 72 bytes long",
    );
}

pub fn validate_user(v: &mut Validator, user: &User) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );

    validate_email(v, &user.email);
    if let Some(plaintext) = user.password.plaintext() {
        validate_password_plaintext(v, plaintext);
    }
    v.check(
        user.password.hash().is_some(),
        "password",
        "must be provided",
    );
}

#[derive(Clone)]
pub struct UserModel {
    store: OptimisticStore<User>,
    tokens: TokenModel,
}

impl UserModel {
    pub fn new(engine: &Engine, tokens: TokenModel, timeout: Duration) -> Self {
        Self {
            store: OptimisticStore::new(engine, timeout, "users"),
            tokens,
        }
    }

    /// Duplicate emails surface as [`DataError::DuplicateKey`].
    pub async fn insert(&self, mut user: User) -> Result<User, DataError> {
        user.password.forget_plaintext();
        self.store.insert(user).await
    }

    pub async fn get(&self, id: i64) -> Result<User, DataError> {
        self.store.get(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, DataError> {
        self.store.find_unique(&email.to_lowercase()).await
    }

    pub async fn update(&self, user: &mut User) -> Result<(), DataError> {
        user.password.forget_plaintext();
        self.store.update(user).await
    }

    /// Owner of an unexpired token of `scope`.
    pub async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, DataError> {
        let user_id = self.tokens.owner_of(scope, plaintext).await?;
        self.store.get(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models() -> (UserModel, TokenModel) {
        let engine = Engine::new();
        let tokens = TokenModel::new(&engine, Duration::from_secs(3));
        (
            UserModel::new(&engine, tokens.clone(), Duration::from_secs(3)),
            tokens,
        )
    }

    fn user(email: &str) -> User {
        User::new(
            "Alice".into(),
            email.into(),
            Password::from_hash("$argon2id$placeholder".into()),
        )
    }

    #[tokio::test]
    async fn duplicate_email_is_case_insensitive() {
        let (users, _) = models();
        users.insert(user("alice@example.com")).await.unwrap();
        let err = users.insert(user("ALICE@example.com")).await.unwrap_err();
        assert!(matches!(err, DataError::DuplicateKey(ref c) if c == EMAIL_CONSTRAINT));
    }

    #[tokio::test]
    async fn update_into_taken_email_is_duplicate() {
        let (users, _) = models();
        users.insert(user("alice@example.com")).await.unwrap();
        let mut bob = users.insert(user("bob@example.com")).await.unwrap();
        bob.email = "alice@example.com".into();
        assert!(matches!(
            users.update(&mut bob).await,
            Err(DataError::DuplicateKey(_))
        ));
    }

    #[tokio::test]
    async fn token_lookup_resolves_owner() {
        let (users, tokens) = models();
        let alice = users.insert(user("alice@example.com")).await.unwrap();
        let token = tokens
            .new_token(alice.id, chrono::Duration::hours(1), Scope::Authentication)
            .await
            .unwrap();

        let found = users
            .get_for_token(Scope::Authentication, &token.plaintext)
            .await
            .unwrap();
        assert_eq!(found.id, alice.id);
        assert!(users
            .get_for_token(Scope::Authentication, "AAAAAAAAAAAAAAAAAAAAAAAAAA")
            .await
            .is_err());
    }

    #[test]
    fn user_validation() {
        let mut v = Validator::new();
        let mut u = user("not-an-email");
        u.name = String::new();
        validate_user(&mut v, &u);
        assert_eq!(v.errors()["name"], "must be provided");
        assert_eq!(v.errors()["email"], "must be a valid email address");

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "short");
        assert_eq!(v.errors()["password"], "must be at least 8 bytes long");
    }

    #[tokio::test]
    async fn stored_users_keep_only_the_hash() {
        let (users, tokens) = models();
        let password = Password::from_plaintext("pa55word123").await.unwrap();
        let mut alice = User::new("Alice".into(), "alice@example.com".into(), password);
        alice = users.insert(alice).await.unwrap();
        assert_eq!(alice.password.plaintext(), None);

        let stored = users.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(stored.password.plaintext(), None);
        assert!(stored.password.matches("pa55word123").await.unwrap());

        let mut changed = stored.clone();
        changed.password = Password::from_plaintext("n3w-pa55word").await.unwrap();
        users.update(&mut changed).await.unwrap();
        let token = tokens
            .new_token(alice.id, chrono::Duration::hours(1), Scope::Authentication)
            .await
            .unwrap();
        let stored = users
            .get_for_token(Scope::Authentication, &token.plaintext)
            .await
            .unwrap();
        assert_eq!(stored.password.plaintext(), None);
        assert!(stored.password.matches("n3w-pa55word").await.unwrap());
    }

    #[tokio::test]
    async fn password_matches() {
        let password = Password::from_plaintext("pa55word123").await.unwrap();
        assert!(password.matches("pa55word123").await.unwrap());
        assert!(!password.matches("nope-nope").await.unwrap());
        assert!(!Password::default().matches("anything").await.unwrap());
    }
}
