//! Structured error types for configuration resolution.

use serde::Serialize;
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors
    FileNotFound,
    Malformed,

    // Derivation errors
    MissingKey,
    NotNumeric,
    DivisionByZero,
    ResumeWithoutFile,

    // Environment errors
    NoFreePort,
    Io,
}

/// Error raised while loading, merging or deriving configuration.
///
/// Nothing is recovered locally; every variant aborts resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config in {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    #[error("required key '{0}' is missing from the merged configuration")]
    MissingKey(String),

    #[error("key '{key}' must be numeric, got {found}")]
    NotNumeric { key: String, found: String },

    #[error("division by zero: '{denominator}' is 0 while computing '{target}'")]
    DivisionByZero {
        target: &'static str,
        denominator: &'static str,
    },

    #[error("resume requested but no config file path was given")]
    ResumeWithoutFile,

    #[error("no free port found scanning upward from {start}")]
    NoFreePort { start: u16 },
}

impl ConfigError {
    /// Classify the error for callers that branch on the failure kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::FileNotFound { .. } => ErrorCode::FileNotFound,
            ConfigError::Io { .. } => ErrorCode::Io,
            ConfigError::Malformed { .. } => ErrorCode::Malformed,
            ConfigError::MissingKey(_) => ErrorCode::MissingKey,
            ConfigError::NotNumeric { .. } => ErrorCode::NotNumeric,
            ConfigError::DivisionByZero { .. } => ErrorCode::DivisionByZero,
            ConfigError::ResumeWithoutFile => ErrorCode::ResumeWithoutFile,
            ConfigError::NoFreePort { .. } => ErrorCode::NoFreePort,
        }
    }

    pub fn malformed(origin: impl Into<String>, reason: impl ToString) -> Self {
        ConfigError::Malformed {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
