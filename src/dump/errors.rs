//! Dump-specific error types
//!
//! Dump errors are never fatal to the process: a failed dump leaves no
//! artifact behind (the partial file is cleaned up) and does not touch the
//! tenant schema.

use std::fmt;

use crate::store::StoreError;

/// Dump error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpErrorCode {
    /// The dump tool exited non-zero
    VaultDumpFailed,
    /// The dump tool could not be started
    VaultDumpSpawn,
    /// I/O failure while streaming or compressing output
    VaultDumpIo,
    /// Bad label or snapshot-store rejection
    VaultDumpName,
}

impl DumpErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpErrorCode::VaultDumpFailed => "VAULT_DUMP_FAILED",
            DumpErrorCode::VaultDumpSpawn => "VAULT_DUMP_SPAWN",
            DumpErrorCode::VaultDumpIo => "VAULT_DUMP_IO",
            DumpErrorCode::VaultDumpName => "VAULT_DUMP_NAME",
        }
    }
}

impl fmt::Display for DumpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dump error with full context
#[derive(Debug)]
pub struct DumpError {
    code: DumpErrorCode,
    message: String,
    /// Exit code of the dump tool, when it ran and failed
    exit_code: Option<i32>,
}

impl DumpError {
    fn new(code: DumpErrorCode, message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            code,
            message: message.into(),
            exit_code,
        }
    }

    /// Non-zero exit from the dump tool; carries exit code and stderr text
    pub fn tool_failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::VaultDumpFailed, stderr, exit_code)
    }

    /// The dump tool could not be spawned
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::VaultDumpSpawn, message, None)
    }

    /// Streaming/compression I/O failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::VaultDumpIo, message, None)
    }

    /// Invalid label or filename
    pub fn bad_name(message: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::VaultDumpName, message, None)
    }

    /// Returns the error code
    pub fn code(&self) -> DumpErrorCode {
        self.code
    }

    /// Returns the error message (tool stderr for `VAULT_DUMP_FAILED`)
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the tool's exit code, if it ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit code {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for DumpError {}

impl From<StoreError> for DumpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(name) => DumpError::bad_name(name),
            other => DumpError::io(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DumpError {
    fn from(err: std::io::Error) -> Self {
        DumpError::io(err.to_string())
    }
}

/// Result type for dump operations
pub type DumpResult<T> = Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DumpErrorCode::VaultDumpFailed.as_str(), "VAULT_DUMP_FAILED");
        assert_eq!(DumpErrorCode::VaultDumpSpawn.as_str(), "VAULT_DUMP_SPAWN");
        assert_eq!(DumpErrorCode::VaultDumpIo.as_str(), "VAULT_DUMP_IO");
        assert_eq!(DumpErrorCode::VaultDumpName.as_str(), "VAULT_DUMP_NAME");
    }

    #[test]
    fn test_tool_failed_carries_exit_code() {
        let err = DumpError::tool_failed(Some(2), "pg_dump: error: schema missing");
        assert_eq!(err.exit_code(), Some(2));
        let display = err.to_string();
        assert!(display.contains("VAULT_DUMP_FAILED"));
        assert!(display.contains("exit code 2"));
        assert!(display.contains("schema missing"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: DumpError = StoreError::InvalidName("bad/name".to_string()).into();
        assert_eq!(err.code(), DumpErrorCode::VaultDumpName);
    }
}
