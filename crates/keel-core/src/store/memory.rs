//! In-memory reference store

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{UserDoc, UserStore};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, CyclePlan, FinancialSnapshot};

/// In-process store backed by a map of raw JSON documents.
///
/// Documents are deserialized on read, so tests can seed malformed records
/// with [`MemoryStore::put_raw_snapshot`] and exercise the engine's
/// per-user failure isolation.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<String, UserDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an arbitrary (possibly malformed) snapshot document
    pub fn put_raw_snapshot(&self, user_id: &str, raw: serde_json::Value) {
        let mut users = lock(&self.users);
        users.entry(user_id.to_string()).or_default().snapshot = Some(raw);
    }

    /// Register a user id without any documents
    pub fn add_user(&self, user_id: &str) {
        let mut users = lock(&self.users);
        users.entry(user_id.to_string()).or_default();
    }
}

fn lock(users: &Mutex<BTreeMap<String, UserDoc>>) -> std::sync::MutexGuard<'_, BTreeMap<String, UserDoc>> {
    users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_doc<T: serde::de::DeserializeOwned>(
    raw: &Option<serde_json::Value>,
    user_id: &str,
    kind: &str,
) -> Result<T> {
    let value = raw
        .as_ref()
        .ok_or_else(|| Error::NotFound(format!("{} for user {}", kind, user_id)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidData(format!("{} for user {}: {}", kind, user_id, e)))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<String>> {
        Ok(lock(&self.users).keys().cloned().collect())
    }

    async fn get_snapshot(&self, user_id: &str) -> Result<FinancialSnapshot> {
        let users = lock(&self.users);
        let doc = users
            .get(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        read_doc(&doc.snapshot, user_id, "snapshot")
    }

    async fn put_snapshot(&self, user_id: &str, snapshot: &FinancialSnapshot) -> Result<()> {
        let raw = serde_json::to_value(snapshot)?;
        lock(&self.users)
            .entry(user_id.to_string())
            .or_default()
            .snapshot = Some(raw);
        Ok(())
    }

    async fn get_plan(&self, user_id: &str) -> Result<CyclePlan> {
        let users = lock(&self.users);
        let doc = users
            .get(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        read_doc(&doc.plan, user_id, "plan")
    }

    async fn put_plan(&self, user_id: &str, plan: &CyclePlan) -> Result<()> {
        let raw = serde_json::to_value(plan)?;
        lock(&self.users)
            .entry(user_id.to_string())
            .or_default()
            .plan = Some(raw);
        Ok(())
    }

    async fn get_result(&self, user_id: &str) -> Result<Option<AnalysisResult>> {
        let users = lock(&self.users);
        match users.get(user_id) {
            Some(doc) if doc.result.is_some() => read_doc(&doc.result, user_id, "result").map(Some),
            _ => Ok(None),
        }
    }

    async fn put_result(&self, user_id: &str, result: &AnalysisResult) -> Result<()> {
        let raw = serde_json::to_value(result)?;
        lock(&self.users)
            .entry(user_id.to_string())
            .or_default()
            .result = Some(raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            current_savings: 1000.0,
            savings_goal: 100_000.0,
            monthly_income: 3000.0,
            monthly_expenses: 2000.0,
            current_week: 1,
            skills: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let store = MemoryStore::new();
        store.put_snapshot("alice", &snapshot()).await.unwrap();

        let loaded = store.get_snapshot("alice").await.unwrap();
        assert_eq!(loaded.current_savings, 1000.0);
        assert_eq!(store.list_users().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_snapshot("nobody").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_invalid_data() {
        let store = MemoryStore::new();
        store.put_raw_snapshot("bob", serde_json::json!({"current_savings": 5.0}));

        assert!(matches!(
            store.get_snapshot("bob").await,
            Err(Error::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_result_absent_is_none() {
        let store = MemoryStore::new();
        store.add_user("carol");
        assert!(store.get_result("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_users_listed_in_stable_order() {
        let store = MemoryStore::new();
        store.add_user("zed");
        store.add_user("amy");
        assert_eq!(store.list_users().await.unwrap(), vec!["amy", "zed"]);
    }
}
