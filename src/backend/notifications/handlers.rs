//! Notification HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::service;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{ListNotificationsQuery, ListNotificationsResponse, NotificationCount};

/// `GET /api/notifications?unread_only=&limit=`
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> BackendResult<Json<ListNotificationsResponse>> {
    let response = service::list(&state, user.user_id, query.unread_only, query.limit).await?;
    Ok(Json(response))
}

/// `GET /api/notifications/unread-count`
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> BackendResult<Json<NotificationCount>> {
    let unread_count = service::unread_count(&state, user.user_id).await?;
    Ok(Json(NotificationCount { unread_count }))
}

/// `PATCH /api/notifications/{id}/read`
///
/// 404 when the notification is missing or belongs to another user.
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> BackendResult<StatusCode> {
    service::mark_read(&state, user.user_id, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> BackendResult<Json<Value>> {
    let updated = service::mark_all_read(&state, user.user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}
