use thiserror::Error;
use warcgraph_scanner::ScanError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Shard {shard} failed after {attempts} attempts: {reason}")]
    ShardFailed {
        shard: String,
        attempts: usize,
        reason: String,
    },

    #[error("Interrupted with {pending} shards not processed")]
    Interrupted { pending: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
