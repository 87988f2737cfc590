//! Error types for the table engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Failed to decode: {0}")]
    Decode(String),

    #[error("Failed to apply update: {0}")]
    Apply(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid lock entry {lock_id}: {reason}")]
    InvalidLock { lock_id: String, reason: String },

    #[error("Undo error: {0}")]
    Undo(String),
}

/// Result alias used across the engine
pub type TableResult<T> = Result<T, TableError>;
