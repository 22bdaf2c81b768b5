//! Error types for board persistence, configuration and backups.
//!
//! Validation problems (an empty title, an end date before the start date) are not
//! errors: the board treats them as silent no-ops. `BoardError` is reserved for the
//! things a caller genuinely has to react to.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("config error at {path}: {msg}")]
    Config { path: PathBuf, msg: String },

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("goal '{0}' not found")]
    GoalNotFound(String),

    #[error("shoutout {0} not found")]
    ShoutoutNotFound(u64),

    #[error("history entry '{0}' not found")]
    HistoryNotFound(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;
