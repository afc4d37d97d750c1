/**
 * Authentication Types
 *
 * Request and response bodies for the `/api/auth` endpoints, plus the
 * input rules the server enforces on registration. The client module
 * deserializes the same types.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Register request
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RegisterRequest {
    /// Chosen username (3-30 chars, starts with a letter, alphanumeric + underscore)
    pub username: String,
    /// Email address
    pub email: String,
    /// Plain password (hashed before storage)
    pub password: String,
    /// Optional display name shown in the UI
    #[serde(default)]
    pub display_name: Option<String>,
}

impl RegisterRequest {
    /// Check the registration rules, reporting the first failing field
    pub fn validate(&self) -> Result<(), SharedError> {
        if !is_valid_username(&self.username) {
            return Err(SharedError::validation(
                "username",
                "Username must be 3-30 chars, start with a letter, and contain only letters, numbers, and underscores",
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(SharedError::validation("email", "Invalid email format"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SharedError::validation(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        if let Some(name) = &self.display_name {
            if name.trim().chars().count() > 60 {
                return Err(SharedError::validation(
                    "display_name",
                    "Display name must be at most 60 characters",
                ));
            }
        }
        Ok(())
    }
}

/// Login request
///
/// `username` may also be an email address.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request carrying the long-lived token
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request; the refresh token is optional so a client that lost it
/// can still revoke its access token.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Access + refresh token pair
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// True when the access token expires within `skew` from now
    pub fn access_expires_within(&self, skew: chrono::Duration) -> bool {
        self.access_expires_at - Utc::now() <= skew
    }
}

/// Returned by register and login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// User information that is safe to return to clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public profile of another user (no email)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub online: bool,
}

/// Query parameters for user search
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

pub fn is_valid_username(username: &str) -> bool {
    if username.len() < 3 || username.len() > 30 {
        return false;
    }

    let mut chars = username.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Basic shape check: one `@` with something on both sides and a dot in the domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
