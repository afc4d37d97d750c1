//! Logout handlers

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::auth::LogoutRequest;

/// End the current session
///
/// Revokes the presented access token until it would expire and, when the
/// body carries one, the matching refresh session.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<LogoutRequest>>,
) -> BackendResult<StatusCode> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    if let Some(refresh_token) = request.refresh_token.as_deref() {
        state.sessions.revoke_refresh(refresh_token, user.user_id)?;
    }
    state.sessions.revoke(&user.claims);
    tracing::info!("User logged out: {}", user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// End every refresh session of the caller
pub async fn logout_all(State(state): State<AppState>, user: AuthUser) -> BackendResult<Json<Value>> {
    let revoked = state.sessions.revoke_all(user.user_id);
    state.sessions.revoke(&user.claims);
    tracing::info!("User {} logged out everywhere ({} session(s))", user.username, revoked);
    Ok(Json(json!({ "revoked_sessions": revoked })))
}
