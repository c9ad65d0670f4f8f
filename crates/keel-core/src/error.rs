//! Error types for Keel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Analysis timed out for user {0}")]
    Timeout(String),

    #[error("A sweep is already in flight")]
    SweepInProgress,

    #[error("Sweep failed: {0}")]
    SweepFailed(String),

    #[error("Alert delivery error: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, Error>;
