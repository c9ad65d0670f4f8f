//! Persistence collaborator interface
//!
//! The engine only needs a key-value capability from persistence: look up a
//! user's snapshot, plan, and last result by an opaque user id, and write
//! plans/results back. Where those documents actually live (files, a
//! database, a remote service) is the collaborator's business.
//!
//! Two reference implementations ship here:
//! - [`MemoryStore`]: in-process, used by tests and embedders
//! - [`JsonStore`]: one JSON document set per user id on local disk

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AnalysisResult, CyclePlan, FinancialSnapshot};

/// Key-value persistence capability consumed by the engine.
///
/// User ids are opaque strings end to end; no path or key convention is
/// assumed beyond equality.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All enrolled user ids. Failure here is fatal for a sweep.
    async fn list_users(&self) -> Result<Vec<String>>;

    async fn get_snapshot(&self, user_id: &str) -> Result<FinancialSnapshot>;
    async fn put_snapshot(&self, user_id: &str, snapshot: &FinancialSnapshot) -> Result<()>;

    async fn get_plan(&self, user_id: &str) -> Result<CyclePlan>;
    async fn put_plan(&self, user_id: &str, plan: &CyclePlan) -> Result<()>;

    /// Previous run's result, if any. `Ok(None)` for a never-analyzed user.
    async fn get_result(&self, user_id: &str) -> Result<Option<AnalysisResult>>;
    async fn put_result(&self, user_id: &str, result: &AnalysisResult) -> Result<()>;
}

/// Raw per-user document set shared by the reference stores.
///
/// Fields hold raw JSON so a malformed stored record surfaces as a typed
/// deserialization error on read, not a crash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct UserDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}
