//! JSON document reference store
//!
//! Persists the whole user map as a single JSON document on disk. User ids
//! stay opaque map keys; nothing about them is turned into a path. Writes
//! go through a temp file and an atomic rename so a crashed run never
//! leaves a half-written store behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{UserDoc, UserStore};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, CyclePlan, FinancialSnapshot};

type UserMap = BTreeMap<String, UserDoc>;

/// File-backed store, one JSON document holding every user.
pub struct JsonStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (or create on first write) a store at the given file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Platform default location: `<data_dir>/keel/users.json`
    pub fn default_path() -> PathBuf {
        dirs_fallback().join("keel").join("users.json")
    }

    async fn load(&self) -> Result<UserMap> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UserMap::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn save(&self, users: &UserMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(users)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update<F>(&self, user_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut UserDoc),
    {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;
        apply(users.entry(user_id.to_string()).or_default());
        self.save(&users).await
    }

    fn doc_field<T: serde::de::DeserializeOwned>(
        users: &UserMap,
        user_id: &str,
        kind: &str,
        field: impl Fn(&UserDoc) -> &Option<serde_json::Value>,
    ) -> Result<T> {
        let doc = users
            .get(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        let value = field(doc)
            .as_ref()
            .ok_or_else(|| Error::NotFound(format!("{} for user {}", kind, user_id)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidData(format!("{} for user {}: {}", kind, user_id, e)))
    }
}

fn dirs_fallback() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[async_trait]
impl UserStore for JsonStore {
    async fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.keys().cloned().collect())
    }

    async fn get_snapshot(&self, user_id: &str) -> Result<FinancialSnapshot> {
        let users = self.load().await?;
        Self::doc_field(&users, user_id, "snapshot", |d| &d.snapshot)
    }

    async fn put_snapshot(&self, user_id: &str, snapshot: &FinancialSnapshot) -> Result<()> {
        let raw = serde_json::to_value(snapshot)?;
        self.update(user_id, |doc| doc.snapshot = Some(raw)).await
    }

    async fn get_plan(&self, user_id: &str) -> Result<CyclePlan> {
        let users = self.load().await?;
        Self::doc_field(&users, user_id, "plan", |d| &d.plan)
    }

    async fn put_plan(&self, user_id: &str, plan: &CyclePlan) -> Result<()> {
        let raw = serde_json::to_value(plan)?;
        self.update(user_id, |doc| doc.plan = Some(raw)).await
    }

    async fn get_result(&self, user_id: &str) -> Result<Option<AnalysisResult>> {
        let users = self.load().await?;
        match users.get(user_id) {
            Some(doc) if doc.result.is_some() => {
                Self::doc_field(&users, user_id, "result", |d| &d.result).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn put_result(&self, user_id: &str, result: &AnalysisResult) -> Result<()> {
        let raw = serde_json::to_value(result)?;
        self.update(user_id, |doc| doc.result = Some(raw)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            current_savings: 2500.0,
            savings_goal: 50_000.0,
            monthly_income: 4000.0,
            monthly_expenses: 2500.0,
            current_week: 3,
            skills: BTreeSet::from(["writing".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("users.json"));

        store.put_snapshot("u-1", &snapshot()).await.unwrap();
        let loaded = store.get_snapshot("u-1").await.unwrap();
        assert_eq!(loaded.current_week, 3);
        assert!(loaded.skills.contains("writing"));
    }

    #[tokio::test]
    async fn test_empty_store_lists_no_users() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("users.json"));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_opaque_ids_survive_as_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("users.json"));

        // ids that would be hostile as file names are fine as map keys
        let id = "user@example.com/../x";
        store.put_snapshot(id, &snapshot()).await.unwrap();
        assert_eq!(store.list_users().await.unwrap(), vec![id.to_string()]);
        assert!(store.get_snapshot(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        JsonStore::new(&path).put_snapshot("u-2", &snapshot()).await.unwrap();

        let reopened = JsonStore::new(&path);
        assert!(reopened.get_snapshot("u-2").await.is_ok());
    }
}
