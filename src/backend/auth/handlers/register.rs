/**
 * Register Handler
 *
 * POST /api/auth/register
 *
 * Validates the request, hashes the password and creates the user, then
 * opens a session for them straight away.
 */
use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::auth::users::{create_user, hash_password};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;
use crate::shared::auth::{AuthResponse, RegisterRequest};

/// Register handler
///
/// # Errors
///
/// * `400 Bad Request` - If a field fails validation
/// * `409 Conflict` - If the username or email is taken
///
/// # Example Request
///
/// ```http
/// POST /api/auth/register HTTP/1.1
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "correct horse"
/// }
/// ```
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> BackendResult<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;
    tracing::info!("Register request for: {}", request.username);

    let password_hash = hash_password(request.password.clone(), state.config.bcrypt_cost).await?;
    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let user = create_user(
        &state.db_pool,
        request.username.trim(),
        request.email.trim(),
        &password_hash,
        display_name,
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            tracing::warn!("Registration conflict for {}", request.username);
            BackendError::conflict("Username or email already registered")
        }
        _ => BackendError::from(e),
    })?;

    let tokens = state.sessions.issue_pair(user.id, &user.username)?;
    tracing::info!("User registered: {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.to_response(),
            tokens,
        }),
    ))
}
