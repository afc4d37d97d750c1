//! Message HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{receipts, service};
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    ChatMessage, EditMessageRequest, ListMessagesQuery, ListMessagesResponse, MarkReadRequest,
    ReadReceipt, SendMessageRequest, UnreadCount,
};

/// Page through a room's history
///
/// ```http
/// GET /api/rooms/{room_id}/messages?before={message_id}&limit=50
/// ```
///
/// # Returns
/// Messages in chronological order plus `has_more`
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> BackendResult<Json<ListMessagesResponse>> {
    Ok(Json(service::history(&state, &user, room_id, &query).await?))
}

/// Send a message
///
/// ```http
/// POST /api/rooms/{room_id}/messages
/// { "content": "hello", "reply_to": null, "client_id": "c-17" }
/// ```
///
/// # Errors
/// - 400 on empty or over-long content, or a `reply_to` from another room
/// - 403 if the caller is not a member
/// - 429 when the per-user rate limit is exceeded
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> BackendResult<(StatusCode, Json<ChatMessage>)> {
    let message = service::send(&state, &user, room_id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn edit_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(request): Json<EditMessageRequest>,
) -> BackendResult<Json<ChatMessage>> {
    Ok(Json(service::edit(&state, &user, message_id, &request.content).await?))
}

pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
) -> BackendResult<StatusCode> {
    service::delete(&state, &user, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a room read up to a message (or its latest message)
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    body: Option<Json<MarkReadRequest>>,
) -> BackendResult<Json<ReadReceipt>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(receipts::mark_read(&state, &user, room_id, request.message_id).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> BackendResult<Json<UnreadCount>> {
    Ok(Json(receipts::unread_count(&state, &user, room_id).await?))
}
