//! Restore-specific error types
//!
//! NotFound/name failures are clean rejections with no side effects. A
//! failure after the target schema was dropped leaves that schema empty or
//! partially populated; the error keeps the tool's raw stderr so an operator
//! can diagnose and re-run (restore is re-entrant: it always starts by
//! dropping and recreating the target).

use std::fmt;

use crate::db::SessionError;
use crate::dump::DumpError;
use crate::store::StoreError;

/// Restore error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreErrorCode {
    /// Tenant or snapshot file missing
    VaultRestoreNotFound,
    /// Malformed snapshot filename, rejected before any access
    VaultRestoreName,
    /// The SQL tool exited non-zero while replaying the snapshot
    VaultRestoreFailed,
    /// The SQL tool exceeded the execution ceiling and was killed
    VaultRestoreTimeout,
    /// The prerestore safety dump failed; no destructive DDL was issued
    VaultRestoreSafetyDump,
    /// I/O failure (decompression, pipes)
    VaultRestoreIo,
}

impl RestoreErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreErrorCode::VaultRestoreNotFound => "VAULT_RESTORE_NOT_FOUND",
            RestoreErrorCode::VaultRestoreName => "VAULT_RESTORE_NAME",
            RestoreErrorCode::VaultRestoreFailed => "VAULT_RESTORE_FAILED",
            RestoreErrorCode::VaultRestoreTimeout => "VAULT_RESTORE_TIMEOUT",
            RestoreErrorCode::VaultRestoreSafetyDump => "VAULT_RESTORE_SAFETY_DUMP",
            RestoreErrorCode::VaultRestoreIo => "VAULT_RESTORE_IO",
        }
    }
}

impl fmt::Display for RestoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Restore error with full context
#[derive(Debug)]
pub struct RestoreError {
    code: RestoreErrorCode,
    message: String,
}

impl RestoreError {
    fn new(code: RestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Snapshot file or tenant missing
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreNotFound, message)
    }

    /// Malformed filename
    pub fn bad_name(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreName, message)
    }

    /// Tool failure; message is the tool's stderr
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreFailed, message)
    }

    /// Execution ceiling exceeded
    pub fn timeout(secs: u64) -> Self {
        Self::new(
            RestoreErrorCode::VaultRestoreTimeout,
            format!("restore exceeded {}s and was killed", secs),
        )
    }

    /// I/O failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreIo, message)
    }

    /// Returns the error code
    pub fn code(&self) -> RestoreErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RestoreError {}

impl From<StoreError> for RestoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(name) => RestoreError::bad_name(name),
            StoreError::NotFound(name) => RestoreError::not_found(name),
            StoreError::Io(message) => RestoreError::io(message),
        }
    }
}

impl From<DumpError> for RestoreError {
    fn from(err: DumpError) -> Self {
        // The Display form keeps the dump code and the tool's exit code.
        Self::new(RestoreErrorCode::VaultRestoreSafetyDump, err.to_string())
    }
}

impl From<SessionError> for RestoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Timeout(secs) => RestoreError::timeout(secs),
            SessionError::Tool { stderr, .. } => RestoreError::failed(stderr),
            other => RestoreError::io(other.to_string()),
        }
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;
