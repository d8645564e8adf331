//! Error types for the AI tutor.
//!
//! Library crates use [`TutorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all tutor operations.
///
/// Only [`TutorError::InvalidInput`] and [`TutorError::StoreUnavailable`] are
/// hard failures of the retrieval path. Data-quality problems (unknown
/// questions, malformed scoring maps) are logged and skipped unless the
/// configuration asks for strict handling.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    /// Malformed or empty query / question text. Raised before any store access.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Content store unreachable, or a query failed to execute.
    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),

    /// A response references a question that is not in the loaded set.
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (bad import bundle, read-only write, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// LLM service error (transport, upstream status, or response shape).
    #[error("llm error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    /// Create an invalid-input error from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a store failure.
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
