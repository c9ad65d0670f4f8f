//! Keel Core Library
//!
//! Shared functionality for the Keel savings-coaching engine:
//! - Progressive 7-week savings plan generation
//! - Pure risk scoring on a single 0-100 scale
//! - Watchdog state machine with an emergency lockdown protocol
//! - Batch analysis sweep with bounded concurrency and failure isolation
//! - Alert dispatch to a pluggable notification sink
//! - Daily sweep scheduler with an injected clock
//! - Key-value persistence collaborator interface with reference stores

pub mod analyzer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod plan;
pub mod risk;
pub mod scheduler;
pub mod store;
pub mod watchdog;

pub use analyzer::BatchAnalyzer;
pub use config::{EngineConfig, PlanConfig, SweepConfig};
pub use dispatch::{AlertDispatcher, AlertSink, MemorySink, TracingSink};
pub use error::{Error, Result};
pub use models::{
    AlertRecord, AnalysisResult, CyclePlan, DifficultyTier, FinancialSnapshot, Lockdown,
    MandatoryAction, NextWeekAdjustment, SpendingLimits, SweepSummary, WatchdogReport,
    WatchdogState, WeekTarget, WeeklyPerformance, ALERT_SCHEMA_VERSION,
};
pub use plan::PlanGenerator;
pub use risk::RiskAssessment;
pub use scheduler::{Clock, SweepGuard, SweepScheduler, SystemClock};
pub use store::{JsonStore, MemoryStore, UserStore};
