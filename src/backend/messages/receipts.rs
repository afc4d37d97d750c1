//! Read receipts and unread counts
//!
//! A member's read pointer only moves forward. Marking an older message as
//! read is accepted but leaves the pointer where it was.

use chrono::Utc;
use uuid::Uuid;

use super::db;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::db as notification_db;
use crate::backend::rooms::{db as room_db, ensure_member};
use crate::backend::server::state::AppState;
use crate::shared::event::{ReadReceiptPayload, ServerEvent};
use crate::shared::messaging::{ReadReceipt, UnreadCount};

/// Move the caller's read pointer to `message_id`, or to the latest message
pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    message_id: Option<Uuid>,
) -> BackendResult<ReadReceipt> {
    ensure_member(state, room_id, user.user_id).await?;

    let target = match message_id {
        Some(id) => Some(
            db::get_message(&state.db_pool, id)
                .await?
                .filter(|m| m.room_id == room_id)
                .ok_or_else(|| BackendError::not_found("Message not found in this room"))?,
        ),
        None => db::latest_message(&state.db_pool, room_id).await?,
    };

    let now = Utc::now();
    let moved = match &target {
        Some(message) => db::advance_read_pointer(&state.db_pool, room_id, user.user_id, message, now).await?,
        None => false,
    };

    let cleared = notification_db::mark_room_read(&state.db_pool, user.user_id, room_id).await?;
    let unread_count = db::unread_count(&state.db_pool, room_id, user.user_id).await?;
    let membership = room_db::get_membership(&state.db_pool, room_id, user.user_id)
        .await?
        .ok_or_else(|| BackendError::forbidden("Not a member of this room"))?;

    if moved {
        tracing::debug!(
            "[Receipts] {} read {} up to {:?} ({} notification(s) cleared)",
            user.username,
            room_id,
            membership.last_read_message_id,
            cleared
        );
        state
            .hub
            .emit_to_room(
                room_id,
                &ServerEvent::MessageRead(ReadReceiptPayload {
                    room_id,
                    user_id: user.user_id,
                    message_id: membership.last_read_message_id,
                    read_at: membership.last_read_at,
                }),
                None,
            )
            .await;
        state
            .hub
            .emit_to_user(
                user.user_id,
                &ServerEvent::UnreadUpdate(UnreadCount { room_id, unread_count }),
            )
            .await;
    }

    Ok(ReadReceipt {
        room_id,
        user_id: user.user_id,
        last_read_message_id: membership.last_read_message_id,
        last_read_at: membership.last_read_at,
        unread_count,
    })
}

pub async fn unread_count(state: &AppState, user: &AuthUser, room_id: Uuid) -> BackendResult<UnreadCount> {
    ensure_member(state, room_id, user.user_id).await?;
    let unread_count = db::unread_count(&state.db_pool, room_id, user.user_id).await?;
    Ok(UnreadCount { room_id, unread_count })
}
