//! Optimistic concurrency control over versioned records.
//!
//! Writers present the version they read. The engine applies the write only
//! if that version is still current and bumps it in the same atomic step.
//! A missing row and a stale version are both reported as
//! [`DataError::EditConflict`]; callers re-read and reapply, or hand the
//! conflict back to the client. Nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use crate::data::{bounded, DataError};
use crate::observability::metrics;
use crate::storage::{Engine, Record, Table};

pub struct OptimisticStore<T> {
    table: Arc<Table<T>>,
    timeout: Duration,
    resource: &'static str,
}

impl<T> Clone for OptimisticStore<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            timeout: self.timeout,
            resource: self.resource,
        }
    }
}

impl<T: Record> OptimisticStore<T> {
    /// `resource` labels conflict metrics and logs.
    pub fn new(engine: &Engine, timeout: Duration, resource: &'static str) -> Self {
        Self {
            table: Arc::new(engine.table()),
            timeout,
            resource,
        }
    }

    /// Insert a record; id and version (1) are assigned by the store.
    pub async fn insert(&self, record: T) -> Result<T, DataError> {
        bounded("insert", self.timeout, self.table.insert(record)).await
    }

    pub async fn get(&self, id: i64) -> Result<T, DataError> {
        if id < 1 {
            return Err(DataError::RecordNotFound);
        }
        bounded("get", self.timeout, self.table.get(id))
            .await?
            .ok_or(DataError::RecordNotFound)
    }

    /// Conditionally write `record`, keyed on its id and the version it was
    /// read at. On success `record` carries the new version.
    pub async fn update(&self, record: &mut T) -> Result<(), DataError> {
        match bounded("update", self.timeout, self.table.update_versioned(record)).await? {
            Some(version) => {
                record.set_version(version);
                Ok(())
            }
            None => {
                tracing::debug!(
                    resource = self.resource,
                    id = record.id(),
                    version = record.version(),
                    "Edit conflict"
                );
                metrics::record_edit_conflict(self.resource);
                Err(DataError::EditConflict)
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), DataError> {
        if id < 1 {
            return Err(DataError::RecordNotFound);
        }
        if bounded("delete", self.timeout, self.table.delete(id)).await? {
            Ok(())
        } else {
            Err(DataError::RecordNotFound)
        }
    }

    pub async fn scan<P>(&self, predicate: P) -> Result<Vec<T>, DataError>
    where
        P: Fn(&T) -> bool,
    {
        bounded("scan", self.timeout, self.table.scan(predicate)).await
    }

    pub async fn find_unique(&self, key: &str) -> Result<T, DataError> {
        bounded("find_unique", self.timeout, self.table.find_unique(key))
            .await?
            .ok_or(DataError::RecordNotFound)
    }
}
