//! Command implementations
//!
//! - `users`: enrollment, plans, status, emergency clearing
//! - `sweep`: manual sweeps, the scheduler, ad-hoc scoring

mod sweep;
mod users;

pub use sweep::{cmd_run, cmd_schedule, cmd_score};
pub use users::{cmd_clear_emergency, cmd_enroll, cmd_plan, cmd_status};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use keel_core::{BatchAnalyzer, EngineConfig, JsonStore, TracingSink};

/// Build the engine and its backing store from the global CLI options.
pub fn build_engine(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
) -> Result<(BatchAnalyzer, Arc<JsonStore>)> {
    let config = load_config(config_path)?;
    let path = store_path.clone().unwrap_or_else(JsonStore::default_path);
    tracing::debug!(store = %path.display(), "opening user store");

    let store = Arc::new(JsonStore::new(&path));
    let engine = BatchAnalyzer::new(store.clone(), Arc::new(TracingSink), config);
    Ok((engine, store))
}

pub fn load_config(config_path: &Option<PathBuf>) -> Result<EngineConfig> {
    match config_path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}
