//! Error types for the sync engine.

use modsync_core::CoreError;
use modsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Scanning, hashing or path validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server has no such file.
    #[error("remote file not found: {path}")]
    NotFound {
        /// Relative path that was requested.
        path: String,
    },

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// A file could not be downloaded within the retry budget.
    #[error("failed to download '{path}' after {attempts} attempts: {message}")]
    DownloadFailed {
        /// Relative path of the file.
        path: String,
        /// Attempts made.
        attempts: u32,
        /// Last error.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server answered with an error status.
    #[error("server error: {0}")]
    ServerError(String),

    /// Local I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An attempt exceeded its timeout.
    #[error("operation timed out")]
    Timeout,

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a non-success HTTP status to an error.
    pub fn from_status(status: u16, path: &str, body: &str) -> Self {
        match status {
            404 => SyncError::NotFound {
                path: path.to_string(),
            },
            500..=599 => SyncError::ServerError(format!("{status}: {body}")),
            _ => SyncError::transport_fatal(format!("unexpected status {status} for {path}: {body}")),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::ServerError(_) => true,
            SyncError::Io(_) => true,
            _ => false,
        }
    }

    /// Returns true for cancellation, which is never reported as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::ServerError("internal error".into()).is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::NotFound { path: "a".into() }.is_retryable());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            SyncError::from_status(404, "SAIN.dll", ""),
            SyncError::NotFound { path } if path == "SAIN.dll"
        ));
        assert!(SyncError::from_status(503, "x", "busy").is_retryable());
        assert!(!SyncError::from_status(400, "x", "bad").is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::DownloadFailed {
            path: "BepInEx/plugins/SAIN.dll".into(),
            attempts: 5,
            message: "connection reset".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SAIN.dll"));
        assert!(msg.contains('5'));
        assert!(SyncError::Cancelled.is_cancelled());
    }
}
