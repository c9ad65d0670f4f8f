//! Alert dispatch
//!
//! Turns a just-computed analysis result into an alert record for the
//! notification collaborator. An alert goes out when the state is severe
//! (Aggressive or Emergency) or when the state moved since the previous
//! run's stored baseline. Delivery is enqueue-at-least-once; retrying a
//! failed delivery belongs to the collaborator, not here.
//!
//! Failed analyses never produce an alert. They are flagged on the
//! diagnostic log channel instead.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{AlertRecord, AnalysisResult, WatchdogState, ALERT_SCHEMA_VERSION};

/// Notification collaborator interface
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &AlertRecord) -> Result<()>;
}

/// Sink that hands alerts to the structured log
pub struct TracingSink;

#[async_trait]
impl AlertSink for TracingSink {
    async fn deliver(&self, alert: &AlertRecord) -> Result<()> {
        tracing::info!(
            user_id = %alert.user_id,
            state = %alert.state,
            risk_score = alert.risk_score,
            schema_version = alert.schema_version,
            "alert"
        );
        Ok(())
    }
}

/// Sink that collects alerts in memory for inspection
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<AlertRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<AlertRecord> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AlertSink for MemorySink {
    async fn deliver(&self, alert: &AlertRecord) -> Result<()> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(alert.clone());
        Ok(())
    }
}

/// Sink that always fails delivery. Test double for collaborator outages.
pub struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    async fn deliver(&self, _alert: &AlertRecord) -> Result<()> {
        Err(Error::Notify("sink unavailable".to_string()))
    }
}

/// Decides per user, per run, whether an alert record goes out.
#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Dispatch for one user. Returns whether an alert was emitted.
    ///
    /// `baseline` is the state stored by the previous run, when that run
    /// completed; with no usable baseline only severe states alert.
    pub async fn dispatch(
        &self,
        user_id: &str,
        result: &AnalysisResult,
        baseline: Option<WatchdogState>,
    ) -> bool {
        if result.analysis_failed {
            tracing::warn!(
                user_id = %user_id,
                reason = result.failure_reason.as_deref().unwrap_or("unknown"),
                "analysis failed, flagged on diagnostics, no alert emitted"
            );
            return false;
        }

        let state = result.watchdog.state;
        let state_changed = baseline.is_some_and(|prev| prev != state);
        if !state.is_severe() && !state_changed {
            return false;
        }

        let record = AlertRecord {
            user_id: user_id.to_string(),
            state,
            risk_score: result.watchdog.risk_score,
            recommended_actions: result.watchdog.recommended_actions.clone(),
            analyzed_at: result.analyzed_at,
            schema_version: ALERT_SCHEMA_VERSION,
        };

        match self.sink.deliver(&record).await {
            Ok(()) => {
                tracing::debug!(user_id = %user_id, state = %state, "alert enqueued");
                true
            }
            Err(e) => {
                // at-least-once enqueue; delivery retries are the collaborator's job
                tracing::warn!(user_id = %user_id, error = %e, "alert delivery failed");
                false
            }
        }
    }
}
