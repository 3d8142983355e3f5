//! SQL session errors

use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from the SQL execution boundary
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Failed to spawn {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error("I/O error talking to SQL tool: {0}")]
    Io(String),

    #[error("SQL tool exited with {}: {stderr}", exit_display(.exit_code))]
    Tool {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("SQL execution exceeded {0}s and was killed")]
    Timeout(u64),
}

fn exit_display(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_carries_stderr() {
        let err = SessionError::Tool {
            exit_code: Some(3),
            stderr: "ERROR: relation missing".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("code 3"));
        assert!(display.contains("relation missing"));
    }

    #[test]
    fn test_signal_exit_display() {
        let err = SessionError::Tool {
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }
}
