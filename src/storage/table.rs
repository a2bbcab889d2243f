//! Versioned tables.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::storage::{Engine, StorageError};

/// A row stored in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Name of the unique constraint reported on collisions.
    const UNIQUE_CONSTRAINT: &'static str = "unique_key";

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn version(&self) -> i32;
    fn set_version(&mut self, version: i32);

    /// Value of the column carrying a unique constraint, if the record has one.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

#[derive(Debug)]
struct TableState<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T: Record> TableState<T> {
    fn key_taken(&self, key: &str, except_id: Option<i64>) -> bool {
        self.rows.values().any(|row| {
            Some(row.id()) != except_id && row.unique_key().as_deref() == Some(key)
        })
    }
}

/// Rows ordered by id with an auto-incrementing primary key.
#[derive(Debug)]
pub struct Table<T> {
    engine: Engine,
    state: RwLock<TableState<T>>,
}

impl<T: Record> Table<T> {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            engine,
            state: RwLock::new(TableState {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Insert a row, assigning its id and initial version 1.
    pub async fn insert(&self, mut row: T) -> Result<T, StorageError> {
        self.engine.round_trip().await?;

        let mut state = self.state.write().expect("table lock poisoned");
        if let Some(key) = row.unique_key() {
            if state.key_taken(&key, None) {
                return Err(StorageError::UniqueViolation {
                    constraint: T::UNIQUE_CONSTRAINT.to_string(),
                });
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        row.set_id(id);
        row.set_version(1);
        state.rows.insert(id, row.clone());
        Ok(row)
    }

    pub async fn get(&self, id: i64) -> Result<Option<T>, StorageError> {
        self.engine.round_trip().await?;
        let state = self.state.read().expect("table lock poisoned");
        Ok(state.rows.get(&id).cloned())
    }

    /// Replace the stored row only if both its id and version match `row`,
    /// bumping the version by one in the same critical section.
    ///
    /// Returns the new version, or `None` when no row matched.
    pub async fn update_versioned(&self, row: &T) -> Result<Option<i32>, StorageError> {
        self.engine.round_trip().await?;

        let mut state = self.state.write().expect("table lock poisoned");
        let matches = state
            .rows
            .get(&row.id())
            .is_some_and(|current| current.version() == row.version());
        if !matches {
            return Ok(None);
        }

        if let Some(key) = row.unique_key() {
            if state.key_taken(&key, Some(row.id())) {
                return Err(StorageError::UniqueViolation {
                    constraint: T::UNIQUE_CONSTRAINT.to_string(),
                });
            }
        }

        let mut updated = row.clone();
        let version = row.version() + 1;
        updated.set_version(version);
        state.rows.insert(row.id(), updated);
        Ok(Some(version))
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        self.engine.round_trip().await?;
        let mut state = self.state.write().expect("table lock poisoned");
        Ok(state.rows.remove(&id).is_some())
    }

    /// All rows matching `predicate`, in id order.
    pub async fn scan<P>(&self, predicate: P) -> Result<Vec<T>, StorageError>
    where
        P: Fn(&T) -> bool,
    {
        self.engine.round_trip().await?;
        let state = self.state.read().expect("table lock poisoned");
        Ok(state.rows.values().filter(|&row| predicate(row)).cloned().collect())
    }

    /// Row holding the given unique key.
    pub async fn find_unique(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.engine.round_trip().await?;
        let state = self.state.read().expect("table lock poisoned");
        Ok(state
            .rows
            .values()
            .find(|row| row.unique_key().as_deref() == Some(key))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        version: i32,
        name: String,
    }

    impl Record for Item {
        const UNIQUE_CONSTRAINT: &'static str = "items_name_key";

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
            Some(self.name.clone())
        }
    }

    fn item(name: &str) -> Item {
        Item {
            id: 0,
            version: 0,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let table = Engine::new().table::<Item>();
        let a = table.insert(item("a")).await.unwrap();
        let b = table.insert(item("b")).await.unwrap();
        assert_eq!((a.id, a.version), (1, 1));
        assert_eq!((b.id, b.version), (2, 1));
    }

    #[tokio::test]
    async fn unique_key_is_enforced() {
        let table = Engine::new().table::<Item>();
        table.insert(item("a")).await.unwrap();
        let err = table.insert(item("a")).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::UniqueViolation {
                constraint: "items_name_key".into()
            }
        );
    }

    #[tokio::test]
    async fn versioned_update_only_matches_current_version() {
        let table = Engine::new().table::<Item>();
        let mut row = table.insert(item("a")).await.unwrap();

        row.name = "renamed".into();
        assert_eq!(table.update_versioned(&row).await.unwrap(), Some(2));

        // `row` still carries version 1.
        assert_eq!(table.update_versioned(&row).await.unwrap(), None);
        let stored = table.get(row.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.name, "renamed");
    }

    #[tokio::test]
    async fn offline_engine_fails_every_operation() {
        let engine = Engine::new();
        let table = engine.table::<Item>();
        engine.set_offline(true);
        assert_eq!(
            table.get(1).await.unwrap_err(),
            StorageError::Unavailable
        );
    }
}
