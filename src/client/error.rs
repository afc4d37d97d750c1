//! Client error types

use thiserror::Error;

use crate::shared::SharedError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure talking to the REST API
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// The refresh token was rejected; the user has to log in again
    #[error("Session expired")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<SharedError> for ClientError {
    fn from(e: SharedError) -> Self {
        ClientError::Gateway(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Gateway(e.to_string())
    }
}
