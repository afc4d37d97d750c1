//! User directory handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::backend::auth::users;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::presence;
use crate::backend::server::state::AppState;
use crate::shared::auth::{UserProfile, UserSearchQuery};

/// GET /api/users?search=prefix
///
/// Username prefix search, excluding the caller. An empty query returns
/// nothing rather than the whole directory.
pub async fn search_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserSearchQuery>,
) -> BackendResult<Json<Vec<UserProfile>>> {
    let prefix = query.search.unwrap_or_default();
    if prefix.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }

    let found = users::search_users(&state.db_pool, &prefix, user.user_id).await?;
    Ok(Json(
        found
            .iter()
            .map(|u| u.to_profile(presence::is_online(&state, u.id)))
            .collect(),
    ))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> BackendResult<Json<UserProfile>> {
    let found = users::require_user(&state.db_pool, user_id).await?;
    Ok(Json(found.to_profile(presence::is_online(&state, found.id))))
}
