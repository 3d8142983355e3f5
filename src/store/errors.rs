//! Snapshot store errors

use thiserror::Error;

/// Result type for snapshot store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Rejected before any filesystem access
    #[error("Invalid snapshot filename: {0}")]
    InvalidName(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Snapshot store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
