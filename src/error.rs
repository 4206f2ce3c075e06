//! Error types for the crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The SDK handle has not been published into the store yet.
    #[error("SDK is not initialized: wait for AppProvider to become ready before calling hooks")]
    NotInitialized,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Request could not be built from the given arguments.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Chat socket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Upload could not be registered or failed in transit.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadFailure),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error detail attached to a failed upload.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct UploadFailure {
    /// Human readable reason.
    pub message: String,
    /// HTTP status when the server rejected the upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl UploadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
