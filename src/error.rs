//! Error types for the tracked cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the tracked cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value store unreachable or write rejected
    #[error("Storage error: {0}")]
    Storage(String),

    /// Pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Failure while writing a dump, before the commit rename
    #[error("Dump failed during {operation} of {}: {message}", .path.display())]
    Dump {
        operation: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Dump file could not be read back at startup
    #[error("Restore failed from {}: {message}", .path.display())]
    Restore { path: PathBuf, message: String },

    /// Key or value rejected before reaching the store
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (runtime, task join)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    pub(crate) fn dump(
        operation: &'static str,
        path: impl Into<PathBuf>,
        err: impl std::fmt::Display,
    ) -> Self {
        CacheError::Dump {
            operation,
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the caller sent something unusable.
    ///
    /// The web layer maps these to client errors and everything else to
    /// server errors.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CacheError::Pattern { .. } | CacheError::InvalidRequest(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tracked cache.
pub type Result<T> = std::result::Result<T, CacheError>;
