//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire data.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A request path is not a fetch path or does not decode.
    #[error("invalid fetch path: {0}")]
    InvalidFetchPath(String),

    /// A version string is not valid semver.
    #[error("invalid version '{version}': {message}")]
    InvalidVersion {
        /// The offending version string.
        version: String,
        /// Parser message.
        message: String,
    },

    /// JSON body could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Creates an invalid fetch path error.
    pub fn invalid_fetch_path(msg: impl Into<String>) -> Self {
        Self::InvalidFetchPath(msg.into())
    }
}
