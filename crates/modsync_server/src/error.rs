//! Error types for the ModSync server.

use modsync_core::CoreError;
use modsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Unknown route, or a file that does not exist or is outside the sync roots.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Scanning or hashing failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Json(e) => ServerError::Serialization(e.to_string()),
            other => ServerError::InvalidRequest(other.to_string()),
        }
    }
}

impl ServerError {
    /// Creates a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::NotFound(_) => 404,
            ServerError::InvalidRequest(_) => 400,
            _ => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::not_found("x").is_client_error());
        assert_eq!(ServerError::not_found("x").status_code(), 404);
        assert_eq!(ServerError::InvalidRequest("bad".into()).status_code(), 400);
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(ServerError::Core(CoreError::Task("panicked".into())).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn protocol_errors_map_to_status() {
        let err: ServerError = ProtocolError::invalid_fetch_path("/modsync/fetch/").into();
        assert_eq!(err.status_code(), 400);
    }
}
