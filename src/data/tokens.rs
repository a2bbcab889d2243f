//! Bearer tokens.
//!
//! Only the SHA-256 of a token is stored. The plaintext is handed to the
//! client once and never persisted; lookups hash the presented value and
//! compare. Expiry is checked at lookup time, there is no reaper.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::data::{bounded, DataError};
use crate::storage::{Engine, KeyedTable};
use crate::validation::Validator;

/// Length of a plaintext token.
pub const TOKEN_LENGTH: usize = 26;

/// Characters a plaintext token is drawn from (RFC 4648 base32).
pub const TOKEN_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

pub type TokenHash = [u8; 32];

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Activation,
    Authentication,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Activation => "activation",
            Scope::Authentication => "authentication",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: TokenHash,
    #[serde(skip)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: Scope,
}

impl Token {
    /// Fresh random token for `user_id`, valid for `ttl`.
    pub fn generate(user_id: i64, ttl: chrono::Duration, scope: Scope) -> Self {
        let mut rng = OsRng;
        let plaintext: String = (0..TOKEN_LENGTH)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();

        Self {
            hash: hash_plaintext(&plaintext),
            plaintext,
            user_id,
            expiry: Utc::now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            scope,
        }
    }
}

pub fn hash_plaintext(plaintext: &str) -> TokenHash {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Exactly [`TOKEN_LENGTH`] characters from [`TOKEN_ALPHABET`].
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LENGTH && plaintext.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
}

pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        is_well_formed(plaintext),
        "token",
        "must be 26 characters long",
    );
}

#[derive(Debug, Clone)]
struct TokenRow {
    user_id: i64,
    expiry: DateTime<Utc>,
    scope: Scope,
}

#[derive(Clone)]
pub struct TokenModel {
    rows: Arc<KeyedTable<TokenHash, TokenRow>>,
    timeout: Duration,
}

impl TokenModel {
    pub fn new(engine: &Engine, timeout: Duration) -> Self {
        Self {
            rows: Arc::new(engine.keyed()),
            timeout,
        }
    }

    /// Generate and store a token.
    pub async fn new_token(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        scope: Scope,
    ) -> Result<Token, DataError> {
        let token = Token::generate(user_id, ttl, scope);
        self.insert(&token).await?;
        Ok(token)
    }

    pub async fn insert(&self, token: &Token) -> Result<(), DataError> {
        let row = TokenRow {
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        };
        bounded(
            "insert_token",
            self.timeout,
            self.rows.insert(token.hash, row, "tokens_pkey"),
        )
        .await
    }

    /// Owner of an unexpired token of `scope` matching `plaintext`.
    pub async fn owner_of(&self, scope: Scope, plaintext: &str) -> Result<i64, DataError> {
        let hash = hash_plaintext(plaintext);
        let row = bounded("lookup_token", self.timeout, self.rows.get(&hash)).await?;
        match row {
            Some(row) if row.scope == scope && row.expiry > Utc::now() => Ok(row.user_id),
            _ => Err(DataError::RecordNotFound),
        }
    }

    /// Delete every token of `scope` belonging to `user_id`.
    pub async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<usize, DataError> {
        bounded(
            "delete_tokens",
            self.timeout,
            self.rows
                .delete_where(|_, row| row.user_id == user_id && row.scope == scope),
        )
        .await
    }
}
