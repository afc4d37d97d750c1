//! Reaction HTTP Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::service;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{ReactionSummary, ReactionUpdate, ToggleReactionRequest};

/// Toggle the caller's reaction on a message
///
/// ```http
/// POST /api/messages/{message_id}/reactions
/// { "emoji": "👍" }
/// ```
pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(request): Json<ToggleReactionRequest>,
) -> BackendResult<Json<ReactionUpdate>> {
    Ok(Json(service::toggle(&state, &user, message_id, &request.emoji).await?))
}

pub async fn list_reactions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
) -> BackendResult<Json<Vec<ReactionSummary>>> {
    Ok(Json(service::list(&state, &user, message_id).await?))
}
