//! Room HTTP Handlers
//!
//! Thin wrappers over [`super::service`]; all authorization happens there.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::service;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    AddMemberRequest, CreateRoomRequest, OpenDirectRequest, RenameRoomRequest, Room, RoomDetail,
    RoomMember, RoomSummary,
};

/// List the caller's rooms
///
/// # Returns
/// Room summaries ordered by last activity, newest first
pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> BackendResult<Json<Vec<RoomSummary>>> {
    Ok(Json(service::list_rooms(&state, &user).await?))
}

/// Create a group room
///
/// ```http
/// POST /api/rooms
/// { "name": "release-crew", "member_ids": ["..."] }
/// ```
///
/// # Errors
/// - 400 on an empty or over-long name
/// - 404 if any member id is unknown
pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateRoomRequest>,
) -> BackendResult<(StatusCode, Json<RoomDetail>)> {
    let detail = service::create_group(&state, &user, &request.name, &request.member_ids).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Open (or reuse) the direct room with another user
pub async fn open_direct(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<OpenDirectRequest>,
) -> BackendResult<Json<Room>> {
    Ok(Json(service::open_direct(&state, &user, request.user_id).await?))
}

pub async fn get_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> BackendResult<Json<RoomDetail>> {
    Ok(Json(service::get_room(&state, &user, room_id).await?))
}

pub async fn rename_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Json(request): Json<RenameRoomRequest>,
) -> BackendResult<Json<Room>> {
    Ok(Json(service::rename_room(&state, &user, room_id, &request.name).await?))
}

pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> BackendResult<Json<Vec<RoomMember>>> {
    Ok(Json(service::members(&state, &user, room_id).await?))
}

/// Add a member to a group room (owner only)
///
/// # Errors
/// - 403 if the caller is not the owner
/// - 409 if the user is already a member
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> BackendResult<(StatusCode, Json<RoomMember>)> {
    let member = service::add_member(&state, &user, room_id, request.user_id).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Remove a member, or leave when `user_id` is the caller
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, user_id)): Path<(Uuid, Uuid)>,
) -> BackendResult<StatusCode> {
    service::remove_member(&state, &user, room_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
