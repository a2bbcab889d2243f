//! Hash-keyed tables.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::storage::{Engine, StorageError};

/// Rows addressed by an arbitrary key rather than a generated id.
#[derive(Debug)]
pub struct KeyedTable<K, V>
where
    K: Eq + Hash,
{
    engine: Engine,
    rows: DashMap<K, V>,
}

impl<K, V> KeyedTable<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            engine,
            rows: DashMap::new(),
        }
    }

    /// Insert a new row; an existing key is a unique violation.
    pub async fn insert(
        &self,
        key: K,
        value: V,
        constraint: &'static str,
    ) -> Result<(), StorageError> {
        self.engine.round_trip().await?;
        match self.rows.entry(key) {
            Entry::Occupied(_) => Err(StorageError::UniqueViolation {
                constraint: constraint.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub async fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        self.engine.round_trip().await?;
        Ok(self.rows.get(key).map(|r| r.value().clone()))
    }

    /// Apply `f` to the row at `key`, creating it from `V::default()` first.
    pub async fn upsert_with<F>(&self, key: K, f: F) -> Result<(), StorageError>
    where
        V: Default,
        F: FnOnce(&mut V),
    {
        self.engine.round_trip().await?;
        let mut row = self.rows.entry(key).or_default();
        f(row.value_mut());
        Ok(())
    }

    /// Delete every row for which `predicate` holds. Returns how many went.
    pub async fn delete_where<P>(&self, predicate: P) -> Result<usize, StorageError>
    where
        P: Fn(&K, &V) -> bool,
    {
        self.engine.round_trip().await?;
        let mut removed = 0;
        self.rows.retain(|k, v| {
            let doomed = predicate(k, v);
            removed += usize::from(doomed);
            !doomed
        });
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_keys_are_rejected() {
        let table = Engine::new().keyed::<String, u32>();
        table.insert("k".into(), 1, "pk").await.unwrap();
        let err = table.insert("k".into(), 2, "pk").await.unwrap_err();
        assert_eq!(
            err,
            StorageError::UniqueViolation {
                constraint: "pk".into()
            }
        );
        assert_eq!(table.get(&"k".into()).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn delete_where_reports_removed_rows() {
        let table = Engine::new().keyed::<u32, &'static str>();
        for (k, v) in [(1, "a"), (2, "b"), (3, "a")] {
            table.insert(k, v, "pk").await.unwrap();
        }
        let removed = table.delete_where(|_, v| *v == "a").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn delete_where_counts_only_its_own_removals() {
        let table = std::sync::Arc::new(Engine::new().keyed::<u32, u32>());
        for k in 0..1_000 {
            table.insert(k, k % 2, "pk").await.unwrap();
        }

        let writer = {
            let table = table.clone();
            tokio::spawn(async move {
                for k in 1_000..3_000 {
                    table.insert(k, 1, "pk").await.unwrap();
                }
            })
        };
        let removed = table.delete_where(|_, v| *v == 0).await.unwrap();
        writer.await.unwrap();

        assert_eq!(removed, 500);
    }
}
