//! Notification operations shared by REST handlers and other services

use uuid::Uuid;

use super::db::{self, NewNotification};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;
use crate::shared::event::ServerEvent;
use crate::shared::messaging::{ListNotificationsResponse, Notification};

/// Default and maximum page of notifications
const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Persist a notification and push it to the user's open connections
pub async fn notify(state: &AppState, new: NewNotification<'_>) -> BackendResult<Notification> {
    let notification = db::insert(&state.db_pool, &new).await?;
    let delivered = state
        .hub
        .emit_to_user(notification.user_id, &ServerEvent::NotificationNew(notification.clone()))
        .await;
    tracing::debug!(
        "[Notifications] {} for {} delivered to {} connection(s)",
        notification.kind.as_str(),
        notification.user_id,
        delivered
    );
    Ok(notification)
}

pub async fn list(
    state: &AppState,
    user_id: Uuid,
    unread_only: bool,
    limit: Option<u32>,
) -> BackendResult<ListNotificationsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let notifications = db::list(&state.db_pool, user_id, unread_only, i64::from(limit)).await?;
    let unread_count = db::unread_count(&state.db_pool, user_id).await?;
    Ok(ListNotificationsResponse {
        notifications,
        unread_count,
    })
}

pub async fn unread_count(state: &AppState, user_id: Uuid) -> BackendResult<u32> {
    Ok(db::unread_count(&state.db_pool, user_id).await?)
}

pub async fn mark_read(state: &AppState, user_id: Uuid, notification_id: Uuid) -> BackendResult<()> {
    if !db::mark_read(&state.db_pool, user_id, notification_id).await? {
        return Err(BackendError::not_found("Notification not found"));
    }
    Ok(())
}

pub async fn mark_all_read(state: &AppState, user_id: Uuid) -> BackendResult<u64> {
    Ok(db::mark_all_read(&state.db_pool, user_id).await?)
}

pub async fn mark_room_read(state: &AppState, user_id: Uuid, room_id: Uuid) -> BackendResult<u64> {
    Ok(db::mark_room_read(&state.db_pool, user_id, room_id).await?)
}
