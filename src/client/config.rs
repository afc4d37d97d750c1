//! Client configuration

use super::error::ClientError;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Where the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let server_url = std::env::var("ROOMLINE_SERVER_URL")
            .ok()
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration for an explicit server URL (`http://` or `https://`)
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        let server_url = server_url.into();
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(server_url));
        }
        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// Gateway URL carrying `access_token` as a query parameter
    pub fn ws_url(&self, access_token: &str) -> String {
        let base = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.server_url.clone()
        };
        format!("{}/ws?token={}", base, access_token)
    }
}
