/**
 * Client Session
 *
 * Holds the token pair and coordinates refreshes. The server rotates
 * refresh tokens on every use, so two refreshes racing with the same token
 * would log the user out once the grace window passes. `refresh` is
 * therefore single-flight: callers queue on one lock, and whoever gets it
 * second sees that the access token it holds is no longer current and takes
 * the already refreshed pair instead of refreshing again.
 */
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};

use super::config::ClientConfig;
use super::error::ClientError;
use crate::shared::auth::{
    AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, TokenPair, UserResponse,
};

/// Shared authentication state for REST and gateway clients
#[derive(Debug, Clone)]
pub struct AuthSession {
    config: ClientConfig,
    http: Client,
    tokens: Arc<RwLock<Option<TokenPair>>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl AuthSession {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ClientConfig, http: Client) -> Self {
        Self {
            config,
            http,
            tokens: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub async fn set_tokens(&self, tokens: TokenPair) {
        *self.tokens.write().await = Some(tokens);
    }

    pub async fn tokens(&self) -> Option<TokenPair> {
        self.tokens.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// Current access token
    pub async fn access_token(&self) -> Result<String, ClientError> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|pair| pair.access_token.clone())
            .ok_or(ClientError::NotAuthenticated)
    }

    pub async fn clear(&self) {
        *self.tokens.write().await = None;
    }

    /// Register a new account and start a session
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserResponse, ClientError> {
        let response = self
            .http
            .post(self.config.api_url("/api/auth/register"))
            .json(request)
            .send()
            .await?;
        let auth: AuthResponse = parse(response).await?;
        self.set_tokens(auth.tokens).await;
        Ok(auth.user)
    }

    /// Log in with username (or email) and password
    pub async fn login(&self, username: &str, password: &str) -> Result<UserResponse, ClientError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.config.api_url("/api/auth/login"))
            .json(&request)
            .send()
            .await?;
        let auth: AuthResponse = parse(response).await?;
        self.set_tokens(auth.tokens).await;
        Ok(auth.user)
    }

    /// Exchange the refresh token for a new pair, at most once per stale token
    ///
    /// `stale_access` is the access token the caller found to be expired or
    /// rejected. If the session already holds a different one, another
    /// caller refreshed in the meantime and that pair is returned as is.
    pub async fn refresh(&self, stale_access: &str) -> Result<TokenPair, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens().await.ok_or(ClientError::NotAuthenticated)?;
        if current.access_token != stale_access {
            tracing::debug!("[Client] Token already refreshed by another caller");
            return Ok(current);
        }

        let response = self
            .http
            .post(self.config.api_url("/api/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: current.refresh_token.clone(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("[Client] Refresh rejected, session expired");
            self.clear().await;
            return Err(ClientError::SessionExpired);
        }

        let pair: TokenPair = parse(response).await?;
        self.set_tokens(pair.clone()).await;
        tracing::info!("[Client] Access token refreshed until {}", pair.access_expires_at);
        Ok(pair)
    }

    /// Refresh ahead of time when the access token expires within `skew`
    pub async fn ensure_fresh(&self, skew: chrono::Duration) -> Result<String, ClientError> {
        let current = self.tokens().await.ok_or(ClientError::NotAuthenticated)?;
        if current.access_expires_within(skew) {
            return Ok(self.refresh(&current.access_token).await?.access_token);
        }
        Ok(current.access_token)
    }

    /// Revoke the session on the server and forget the tokens
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(current) = self.tokens().await else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.config.api_url("/api/auth/logout"))
            .bearer_auth(&current.access_token)
            .json(&LogoutRequest {
                refresh_token: Some(current.refresh_token.clone()),
            })
            .send()
            .await?;
        self.clear().await;
        check(response).await.map(|_| ())
    }
}

/// Turn a non-success response into `ClientError::Api`
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| if body.is_empty() { status.to_string() } else { body });
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json::<T>().await?)
}
