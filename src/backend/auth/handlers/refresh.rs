//! Token rotation handler
//!
//! POST /api/auth/refresh exchanges a refresh token for a new pair. See
//! [`SessionManager::rotate`](crate::backend::auth::SessionManager::rotate)
//! for the one-time-use and grace window rules.

use axum::{extract::State, response::Json};

use crate::backend::error::BackendResult;
use crate::backend::server::state::AppState;
use crate::shared::auth::{RefreshRequest, TokenPair};

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> BackendResult<Json<TokenPair>> {
    let pair = state.sessions.rotate(&request.refresh_token)?;
    Ok(Json(pair))
}
