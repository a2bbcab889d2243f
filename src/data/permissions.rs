//! Per-user permission codes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::data::{bounded, DataError};
use crate::storage::{Engine, KeyedTable};

pub const MOVIES_READ: &str = "movies:read";
pub const MOVIES_WRITE: &str = "movies:write";

/// Codes that can be granted. Anything else is ignored on grant.
pub const KNOWN_PERMISSIONS: &[&str] = &[MOVIES_READ, MOVIES_WRITE];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn includes(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone)]
pub struct PermissionModel {
    grants: Arc<KeyedTable<i64, Vec<String>>>,
    timeout: Duration,
}

impl PermissionModel {
    pub fn new(engine: &Engine, timeout: Duration) -> Self {
        Self {
            grants: Arc::new(engine.keyed()),
            timeout,
        }
    }

    pub async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), DataError> {
        let codes: Vec<String> = codes
            .iter()
            .filter(|c| KNOWN_PERMISSIONS.contains(c))
            .map(|c| c.to_string())
            .collect();

        bounded(
            "add_permissions",
            self.timeout,
            self.grants.upsert_with(user_id, move |granted| {
                for code in codes {
                    if !granted.contains(&code) {
                        granted.push(code);
                    }
                }
            }),
        )
        .await
    }

    pub async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, DataError> {
        let codes = bounded("get_permissions", self.timeout, self.grants.get(&user_id)).await?;
        Ok(codes.map(Permissions).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_accumulate_without_duplicates() {
        let model = PermissionModel::new(&Engine::new(), Duration::from_secs(3));
        model.add_for_user(7, &[MOVIES_READ]).await.unwrap();
        model
            .add_for_user(7, &[MOVIES_READ, MOVIES_WRITE, "admin:everything"])
            .await
            .unwrap();

        let perms = model.get_all_for_user(7).await.unwrap();
        assert_eq!(perms.iter().collect::<Vec<_>>(), vec![MOVIES_READ, MOVIES_WRITE]);
        assert!(!perms.includes("admin:everything"));
        assert_eq!(model.get_all_for_user(8).await.unwrap(), Permissions::default());
    }
}
