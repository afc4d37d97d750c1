/**
 * Login Handler
 *
 * This module implements the user authentication handler for POST /api/auth/login.
 *
 * # Authentication Process
 *
 * 1. Look up user by username or email
 * 2. Verify password using bcrypt
 * 3. Issue an access + refresh token pair
 * 4. Return tokens and user info
 *
 * # Security
 *
 * - Unknown user and wrong password produce the same 401
 * - User passwords are never returned in responses
 */
use axum::{extract::State, response::Json};

use crate::backend::auth::users::{get_user_by_login, verify_password};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;
use crate::shared::auth::{AuthResponse, LoginRequest};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Login handler
///
/// # Errors
///
/// * `401 Unauthorized` - If user is not found or password is incorrect
/// * `500 Internal Server Error` - If the database or hashing fails
///
/// # Example Request
///
/// ```http
/// POST /api/auth/login HTTP/1.1
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "correct horse"
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> BackendResult<Json<AuthResponse>> {
    tracing::info!("Login request for: {}", request.username);

    let user = get_user_by_login(&state.db_pool, request.username.trim())
        .await?
        .ok_or_else(|| {
            tracing::warn!("User not found: {}", request.username);
            BackendError::unauthorized(INVALID_CREDENTIALS)
        })?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        tracing::warn!("Invalid password for user: {}", user.username);
        return Err(BackendError::unauthorized(INVALID_CREDENTIALS));
    }

    let tokens = state.sessions.issue_pair(user.id, &user.username)?;
    tracing::info!("User logged in successfully: {}", user.username);

    Ok(Json(AuthResponse {
        user: user.to_response(),
        tokens,
    }))
}
