/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * These errors are returned from HTTP handlers and gateway dispatch alike:
 * handlers turn them into JSON responses, the gateway turns them into
 * `error` frames using `code()`.
 *
 * # Error Types
 *
 * - `HandlerError` - Request-level failures carrying an HTTP status
 * - `StateError` - Application state failures
 * - `ProtocolError` - Malformed gateway frames
 * - `DatabaseError` / `TokenError` / `PasswordError` - library failures
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use roomline::backend::error::BackendError;
///
/// let err = BackendError::forbidden("Not a member of this room");
/// assert_eq!(err.code(), "forbidden");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing membership, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// State management error
    #[error("State error: {message}")]
    StateError { message: String },

    /// Gateway protocol error (frame could not be decoded)
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// Shared error (validation, serialization)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordError(#[from] bcrypt::BcryptError),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::CONFLICT, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Create a new state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::StateError {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `ProtocolError`, validation errors - 400 Bad Request
    /// - `DatabaseError` - 404 for missing rows, 409 for unique violations, else 500
    /// - `TokenError` - 401 Unauthorized
    /// - Everything else - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::StateError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DatabaseError(err) => match err {
                sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
                sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::TokenError(_) => StatusCode::UNAUTHORIZED,
            Self::PasswordError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code, used in gateway `error` frames
    pub fn code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            _ => "internal",
        }
    }

    /// Get the error message
    ///
    /// Internal failures are reported generically; their details only go to
    /// the log.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::StateError { .. } => "Internal server error".to_string(),
            Self::ProtocolError { message } => message.clone(),
            Self::SharedError(SharedError::ValidationError { message, .. }) => message.clone(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(_) => "Internal server error".to_string(),
            Self::DatabaseError(sqlx::Error::RowNotFound) => "Not found".to_string(),
            Self::DatabaseError(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                "Already exists".to_string()
            }
            Self::DatabaseError(_) => "Internal server error".to_string(),
            Self::TokenError(_) => "Invalid or expired token".to_string(),
            Self::PasswordError(_) => "Internal server error".to_string(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}
