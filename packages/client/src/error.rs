//! Error types for the Kizuna client.

use reqwest::StatusCode;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The token was rejected by the server
    #[error("Token rejected by the server")]
    Unauthorized,

    /// The server answered with an error body
    #[error("{kind} ({status}): {message}")]
    Api {
        status: StatusCode,
        kind: String,
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Base URL that cannot be turned into a WebSocket URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}
