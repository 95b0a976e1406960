//! Stream error types
//!
//! These are errors the caller can act on when setting up a stream. Failures
//! after a connection attempt has started are not errors: they surface as a
//! `Disconnected` status with [`crate::events::DisconnectReason::Failed`].

use thiserror::Error;

/// Errors that can occur while preparing a stream connection
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream path must not be empty")]
    EmptyPath,

    #[error("Invalid stream URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
