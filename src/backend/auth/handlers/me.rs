//! Get current user handler

use axum::{extract::State, response::Json};

use crate::backend::auth::users::require_user;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::auth::UserResponse;

/// GET /api/auth/me
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> BackendResult<Json<UserResponse>> {
    let record = require_user(&state.db_pool, user.user_id).await?;
    Ok(Json(record.to_response()))
}
