//! Reaction operations

use uuid::Uuid;

use super::db;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::messages::service::require_message;
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::{db::NewNotification, notify};
use crate::backend::rooms::ensure_member;
use crate::backend::server::state::AppState;
use crate::shared::event::ServerEvent;
use crate::shared::messaging::{validate_emoji, NotificationKind, ReactionSummary, ReactionUpdate};

/// Add the caller's `emoji` to a message, or remove it if already present
pub async fn toggle(
    state: &AppState,
    user: &AuthUser,
    message_id: Uuid,
    emoji: &str,
) -> BackendResult<ReactionUpdate> {
    let emoji = emoji.trim();
    validate_emoji(emoji)?;

    let message = require_message(state, message_id).await?;
    ensure_member(state, message.room_id, user.user_id).await?;
    if message.is_deleted() {
        return Err(BackendError::bad_request("Cannot react to a deleted message"));
    }

    let added = db::toggle(&state.db_pool, message_id, user.user_id, emoji).await?;
    let reactions = db::summary(&state.db_pool, message_id).await?;
    let update = ReactionUpdate {
        room_id: message.room_id,
        message_id,
        user_id: user.user_id,
        emoji: emoji.to_string(),
        added,
        reactions,
    };

    tracing::debug!(
        "[Reactions] {} {} {} on {}",
        user.username,
        if added { "added" } else { "removed" },
        emoji,
        message_id
    );
    state
        .hub
        .emit_to_room(message.room_id, &ServerEvent::ReactionUpdated(update.clone()), None)
        .await;

    if added && message.sender_id != user.user_id {
        let body = format!("{} reacted {} to your message", user.username, emoji);
        let result = notify(
            state,
            NewNotification {
                user_id: message.sender_id,
                kind: NotificationKind::Reaction,
                room_id: Some(message.room_id),
                message_id: Some(message_id),
                actor_id: Some(user.user_id),
                body: &body,
            },
        )
        .await;
        if let Err(e) = result {
            tracing::warn!("[Reactions] Notification for {} failed: {}", message.sender_id, e);
        }
    }

    Ok(update)
}

pub async fn list(state: &AppState, user: &AuthUser, message_id: Uuid) -> BackendResult<Vec<ReactionSummary>> {
    let message = require_message(state, message_id).await?;
    ensure_member(state, message.room_id, user.user_id).await?;
    Ok(db::summary(&state.db_pool, message_id).await?)
}
