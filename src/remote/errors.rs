//! Remote store errors

use thiserror::Error;

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote store errors
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Remote I/O error: {0}")]
    Io(String),
}
