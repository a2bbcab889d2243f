//! In-memory relational engine.
//!
//! The rest of the crate treats this as an opaque store reached through
//! id-keyed get/insert/update/delete operations. Each operation is atomic
//! on its own: the versioned update in particular checks and bumps the
//! version inside one critical section, never as read-then-write from the
//! caller.
//!
//! # Data Flow
//! ```text
//! data models (timeouts, error mapping)
//!     → Table<T>        versioned rows, unique constraints
//!     → KeyedTable<K,V> hash-keyed rows (tokens, permissions)
//!     → Engine          shared simulation knobs (latency, outage)
//! ```

pub mod keyed;
pub mod table;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use keyed::KeyedTable;
pub use table::{Record, Table};

/// Errors raised by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("duplicate key value violates unique constraint \"{constraint}\"")]
    UniqueViolation { constraint: String },

    #[error("storage unavailable")]
    Unavailable,
}

/// Engine-wide behaviour shared by every table.
#[derive(Debug, Default)]
struct EngineState {
    latency_ms: AtomicU64,
    offline: AtomicBool,
}

/// Handle to the engine. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    state: Arc<EngineState>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty versioned table.
    pub fn table<T: Record>(&self) -> Table<T> {
        Table::new(self.clone())
    }

    /// Create an empty hash-keyed table.
    pub fn keyed<K, V>(&self) -> KeyedTable<K, V>
    where
        K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        KeyedTable::new(self.clone())
    }

    /// Delay applied to every operation, emulating a network round trip.
    pub fn set_latency(&self, latency: Duration) {
        self.state
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// While offline every operation fails with [`StorageError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::Relaxed);
    }

    /// Entry point of every operation: simulate the round trip, then check
    /// availability.
    pub(crate) async fn round_trip(&self) -> Result<(), StorageError> {
        let latency = self.state.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.state.offline.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}
