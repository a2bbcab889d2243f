//! Data models.
//!
//! Each model wraps one storage table, bounds every call with the storage
//! deadline and maps engine errors onto domain outcomes.
//!
//! # Data Flow
//! ```text
//! handler
//!     → MovieModel / UserModel (validation already done)
//!     → OptimisticStore<T> (deadline, version compare-and-swap)
//!     → storage::Table<T>
//! ```

pub mod filters;
pub mod movies;
pub mod optimistic;
pub mod permissions;
pub mod tokens;
pub mod users;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::resilience::timeouts::{with_deadline, DeadlineExceeded};
use crate::storage::{Engine, StorageError};

pub use filters::{Filters, Metadata};
pub use movies::{Movie, MovieModel, Runtime};
pub use optimistic::OptimisticStore;
pub use permissions::{PermissionModel, Permissions};
pub use tokens::{Scope, Token, TokenModel};
pub use users::{Password, User, UserModel};

/// Outcome of a model operation that did not succeed.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("record not found")]
    RecordNotFound,

    /// No row matched id and version: either deleted or modified since read.
    #[error("edit conflict")]
    EditConflict,

    #[error("duplicate key value violates unique constraint \"{0}\"")]
    DuplicateKey(String),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("storage failure: {0}")]
    Storage(StorageError),
}

impl DataError {
    /// Infrastructure failures, as opposed to business outcomes.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, DataError::Timeout(_) | DataError::Storage(_))
    }
}

impl From<StorageError> for DataError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation { constraint } => DataError::DuplicateKey(constraint),
            other => DataError::Storage(other),
        }
    }
}

/// Run one storage operation under the storage deadline.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, DataError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    Ok(with_deadline(operation, limit, fut).await??)
}

/// All models sharing one engine.
#[derive(Clone)]
pub struct Models {
    pub movies: MovieModel,
    pub users: UserModel,
    pub tokens: TokenModel,
    pub permissions: PermissionModel,
}

impl Models {
    pub fn new(engine: &Engine, query_timeout: Duration) -> Self {
        let tokens = TokenModel::new(engine, query_timeout);
        Self {
            movies: MovieModel::new(engine, query_timeout),
            users: UserModel::new(engine, tokens.clone(), query_timeout),
            tokens,
            permissions: PermissionModel::new(engine, query_timeout),
        }
    }
}
