//! Engine configuration
//!
//! Defaults cover the standard 7-week cycle; a TOML file can override any
//! subset of fields:
//!
//! ```toml
//! [plan]
//! weekly_floor = 250.0
//!
//! [sweep]
//! pool_size = 32
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Target curve parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Weeks in a cycle
    pub weeks: u32,
    /// Week-over-week growth applied to the base target
    pub growth_rate: f64,
    /// Minimum weekly savings target (currency units)
    pub weekly_floor: f64,
    /// Income target as a multiple of the savings target
    pub income_target_factor: f64,
    /// Share of a week's income that seeds the base target
    pub base_income_share: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            weeks: 7,
            growth_rate: 0.15,          // +15% per week
            weekly_floor: 300.0,        // never ask for less than this
            income_target_factor: 1.3,  // earn 30% above the savings target
            base_income_share: 0.25,    // 25% of one week's income
        }
    }
}

/// Batch sweep parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Concurrent per-user analyses (bounded pool, not one task per user)
    pub pool_size: usize,
    /// Per-user computation bound in seconds
    pub user_timeout_secs: u64,
    /// Backoff before the single persistence retry, in milliseconds
    pub retry_backoff_ms: u64,
    /// Sweep guard is considered abandoned after this many seconds
    pub guard_stale_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,         // tens, not thousands
            user_timeout_secs: 5,  // a hang must not stall the pool
            retry_backoff_ms: 200,
            guard_stale_secs: 600, // a crashed run frees the guard in 10 min
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub plan: PlanConfig,
    pub sweep: SweepConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}
