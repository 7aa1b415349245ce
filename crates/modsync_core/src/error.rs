//! Error types for ModSync core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A SyncPath or other configured value is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error on a specific file.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Fewer bytes were read than the file length promised.
    #[error("short read on {path:?}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// File being hashed.
        path: PathBuf,
        /// Bytes requested.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },

    /// A glob pattern could not be compiled.
    #[error("invalid glob '{pattern}': {message}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// A hashing worker failed to complete.
    #[error("hashing task failed: {0}")]
    Task(String),
}

impl CoreError {
    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::Config(_))
    }

    /// Returns true if the error was caused by the file not existing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
