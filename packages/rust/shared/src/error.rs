//! Error types for ClauseForge.
//!
//! Library crates use [`ClauseForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ClauseForge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClauseForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Delegated completion-service error (network, non-2xx, timeout,
    /// or a response that is not valid JSON for the task).
    #[error("service error: {0}")]
    Service(String),

    /// Text or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Lifecycle conflict (e.g., promoting a candidate that no longer exists).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Data validation error (empty document, invalid country code, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ClauseForgeError>;

impl ClauseForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ClauseForgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ClauseForgeError::Conflict("candidate already promoted".into());
        assert!(err.to_string().contains("already promoted"));

        let err = ClauseForgeError::Service("HTTP 503".into());
        assert_eq!(err.to_string(), "service error: HTTP 503");
    }
}
