//! Message operations
//!
//! Sending persists first and then pushes: `message:new` to everyone
//! subscribed to the room, `unread:update` to every other member, and a
//! `message` notification to members who have no socket viewing the room.
//! Push failures are logged and never fail the send.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::db::{self, MessageRecord};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::{db::NewNotification, notify};
use crate::backend::reactions::db as reaction_db;
use crate::backend::rooms::{db as room_db, ensure_member};
use crate::backend::server::state::AppState;
use crate::shared::event::{MessageDeletedPayload, ServerEvent};
use crate::shared::messaging::{
    normalize_content, ChatMessage, ListMessagesQuery, ListMessagesResponse, MemberRole,
    MessageKind, NotificationKind, Room, SendMessageRequest, UnreadCount,
};

/// How long a client message id is remembered for retry de-duplication
pub const CLIENT_ID_TTL: Duration = Duration::from_secs(300);

/// Placeholder stored under a client message id while its send is in flight
const PENDING_CLIENT_ID: &str = "pending";

/// How often, and how many times, a retry checks a pending client message id
const CLAIM_POLL: Duration = Duration::from_millis(20);
const CLAIM_ATTEMPTS: usize = 250;

/// Longest accepted client message id
const MAX_CLIENT_ID_LEN: usize = 64;

/// Length of the message preview in notification bodies
const PREVIEW_LEN: usize = 80;

fn client_id_key(sender_id: Uuid, client_id: &str) -> String {
    format!("client_msg:{}:{}", sender_id, client_id)
}

fn rate_key(sender_id: Uuid) -> String {
    format!("rate:msg:{}", sender_id)
}

/// Post a message to a room
pub async fn send(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    request: SendMessageRequest,
) -> BackendResult<ChatMessage> {
    let content = normalize_content(&request.content, state.config.max_message_len)?;
    let (room, _) = ensure_member(state, room_id, user.user_id).await?;

    let client_id = request.client_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let claim = match client_id {
        Some(client_id) => {
            if client_id.len() > MAX_CLIENT_ID_LEN {
                return Err(BackendError::bad_request("client_id is too long"));
            }
            match claim_client_id(state, user.user_id, client_id).await? {
                Claim::Duplicate(existing) => {
                    tracing::debug!("[Messages] Duplicate client_id {} from {}", client_id, user.username);
                    return Ok(*existing);
                }
                Claim::Owned(key) => Some(key),
            }
        }
        None => None,
    };

    let record = match insert_checked(state, user, room_id, &content, request.reply_to).await {
        Ok(record) => record,
        Err(e) => {
            if let Some(key) = &claim {
                state.cache.delete(key);
            }
            return Err(e);
        }
    };

    if let Some(key) = claim {
        state.cache.set(key, record.id.to_string(), Some(CLIENT_ID_TTL));
    }

    room_db::touch_last_message(&state.db_pool, room_id, record.created_at).await?;
    db::advance_read_pointer(&state.db_pool, room_id, user.user_id, &record, record.created_at).await?;

    let message = record.into_message(Vec::new());
    tracing::info!(
        "[Messages] {} -> room {} ({} chars)",
        user.username,
        room.id,
        message.content.chars().count()
    );

    let delivered = state
        .hub
        .emit_to_room(room_id, &ServerEvent::MessageNew(message.clone()), None)
        .await;
    tracing::debug!("[Messages] message:new delivered to {} connection(s)", delivered);

    fan_out(state, user, &message).await;

    Ok(message)
}

/// Page backwards through a room's history
///
/// The page is fetched newest first with one extra row to learn whether
/// older messages exist, then returned oldest first.
pub async fn history(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    query: &ListMessagesQuery,
) -> BackendResult<ListMessagesResponse> {
    ensure_member(state, room_id, user.user_id).await?;
    let limit = query.effective_limit(state.config.history_page_size);

    let before_seq = match query.before {
        Some(before) => {
            let anchor = db::get_message(&state.db_pool, before)
                .await?
                .filter(|m| m.room_id == room_id)
                .ok_or_else(|| BackendError::bad_request("before must reference a message in this room"))?;
            Some(anchor.seq)
        }
        None => None,
    };

    let mut records = db::page(&state.db_pool, room_id, before_seq, i64::from(limit) + 1).await?;
    let has_more = records.len() > limit as usize;
    records.truncate(limit as usize);
    records.reverse();

    let mut reactions = match (records.first(), records.last()) {
        (Some(first), Some(last)) => {
            db::reactions_for_range(&state.db_pool, room_id, first.seq, last.seq).await?
        }
        _ => Default::default(),
    };

    let messages = records
        .into_iter()
        .map(|record| {
            let summary = reactions.remove(&record.id).unwrap_or_default();
            record.into_message(summary)
        })
        .collect();

    Ok(ListMessagesResponse { messages, has_more })
}

/// Replace the content of one of the caller's own messages
pub async fn edit(
    state: &AppState,
    user: &AuthUser,
    message_id: Uuid,
    content: &str,
) -> BackendResult<ChatMessage> {
    let record = require_message(state, message_id).await?;
    ensure_member(state, record.room_id, user.user_id).await?;

    if record.sender_id != user.user_id || record.kind() == MessageKind::System {
        return Err(BackendError::forbidden("Only the sender can edit this message"));
    }
    if record.is_deleted() {
        return Err(BackendError::bad_request("Deleted messages cannot be edited"));
    }
    let content = normalize_content(content, state.config.max_message_len)?;

    db::update_content(&state.db_pool, message_id, &content, Utc::now()).await?;
    let updated = require_message(state, message_id).await?;
    let reactions = reaction_db::summary(&state.db_pool, message_id).await?;
    let message = updated.into_message(reactions);

    tracing::info!("[Messages] {} edited {}", user.username, message_id);
    state
        .hub
        .emit_to_room(message.room_id, &ServerEvent::MessageUpdated(message.clone()), None)
        .await;

    Ok(message)
}

/// Soft-delete a message; allowed for its sender and the room owner
///
/// Deleting an already deleted message succeeds without a second event.
pub async fn delete(state: &AppState, user: &AuthUser, message_id: Uuid) -> BackendResult<()> {
    let record = require_message(state, message_id).await?;
    let (_, membership) = ensure_member(state, record.room_id, user.user_id).await?;

    let is_sender = record.sender_id == user.user_id;
    if !is_sender && membership.role() != MemberRole::Owner {
        return Err(BackendError::forbidden("Only the sender or the room owner can delete this message"));
    }

    if !db::soft_delete(&state.db_pool, message_id, Utc::now()).await? {
        return Ok(());
    }

    tracing::info!("[Messages] {} deleted {}", user.username, message_id);
    state
        .hub
        .emit_to_room(
            record.room_id,
            &ServerEvent::MessageDeleted(MessageDeletedPayload {
                room_id: record.room_id,
                message_id,
            }),
            None,
        )
        .await;

    Ok(())
}

/// Record a membership change in the room's timeline
///
/// System messages never count as unread and cannot be edited.
pub async fn post_system_message(
    state: &AppState,
    room: &Room,
    actor_id: Uuid,
    text: &str,
) -> BackendResult<ChatMessage> {
    let record = db::insert_message(&state.db_pool, room.id, actor_id, text, MessageKind::System, None).await?;
    room_db::touch_last_message(&state.db_pool, room.id, record.created_at).await?;

    let message = record.into_message(Vec::new());
    state
        .hub
        .emit_to_room(room.id, &ServerEvent::MessageNew(message.clone()), None)
        .await;
    Ok(message)
}

pub(crate) async fn require_message(state: &AppState, message_id: Uuid) -> BackendResult<MessageRecord> {
    db::get_message(&state.db_pool, message_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Message not found"))
}

/// Outcome of claiming a client message id
enum Claim {
    /// The key is reserved for this send
    Owned(String),
    /// An earlier send with the same id already stored this message
    Duplicate(Box<ChatMessage>),
}

/// Reserve `client_msg:{sender}:{client_id}` before inserting
///
/// The key holds `PENDING_CLIENT_ID` while the first send is in flight and
/// the message id once it is stored. A concurrent retry waits for the id
/// instead of inserting a second copy.
async fn claim_client_id(state: &AppState, sender_id: Uuid, client_id: &str) -> BackendResult<Claim> {
    let key = client_id_key(sender_id, client_id);
    for _ in 0..CLAIM_ATTEMPTS {
        let Some(raw) = state
            .cache
            .set_if_absent(key.clone(), PENDING_CLIENT_ID, Some(CLIENT_ID_TTL))
        else {
            return Ok(Claim::Owned(key));
        };
        if raw != PENDING_CLIENT_ID {
            let existing = match Uuid::parse_str(&raw) {
                Ok(message_id) => load_message(state, message_id).await?,
                Err(_) => None,
            };
            return match existing {
                Some(message) => Ok(Claim::Duplicate(Box::new(message))),
                None => {
                    // Stored message is gone; let this send take the key over
                    state.cache.set(key.clone(), PENDING_CLIENT_ID, Some(CLIENT_ID_TTL));
                    Ok(Claim::Owned(key))
                }
            };
        }
        tokio::time::sleep(CLAIM_POLL).await;
    }
    Err(BackendError::conflict("A message with this client_id is still being sent"))
}

async fn load_message(state: &AppState, message_id: Uuid) -> BackendResult<Option<ChatMessage>> {
    let Some(record) = db::get_message(&state.db_pool, message_id).await? else {
        return Ok(None);
    };
    let reactions = reaction_db::summary(&state.db_pool, message_id).await?;
    Ok(Some(record.into_message(reactions)))
}

/// Rate limit, validate `reply_to` and store the message
async fn insert_checked(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    content: &str,
    reply_to: Option<Uuid>,
) -> BackendResult<MessageRecord> {
    check_rate_limit(state, user.user_id)?;

    if let Some(reply_to) = reply_to {
        let parent = db::get_message(&state.db_pool, reply_to).await?;
        if !parent.is_some_and(|p| p.room_id == room_id) {
            return Err(BackendError::bad_request("reply_to must reference a message in this room"));
        }
    }

    Ok(db::insert_message(&state.db_pool, room_id, user.user_id, content, MessageKind::Text, reply_to).await?)
}

fn check_rate_limit(state: &AppState, sender_id: Uuid) -> BackendResult<()> {
    let count = state
        .cache
        .incr(&rate_key(sender_id), state.config.message_rate_window());
    if count > u64::from(state.config.message_rate_limit) {
        tracing::warn!("[Messages] Rate limit hit by {} ({} in window)", sender_id, count);
        return Err(BackendError::rate_limited("Too many messages, slow down"));
    }
    Ok(())
}

async fn fan_out(state: &AppState, sender: &AuthUser, message: &ChatMessage) {
    let members = match room_db::member_ids(&state.db_pool, message.room_id).await {
        Ok(members) => members,
        Err(e) => {
            tracing::warn!("[Messages] Fan-out for {} skipped: {}", message.id, e);
            return;
        }
    };

    let body = format!("{}: {}", sender.username, message.preview(PREVIEW_LEN));
    for member in members.into_iter().filter(|id| *id != sender.user_id) {
        match db::unread_count(&state.db_pool, message.room_id, member).await {
            Ok(unread_count) => {
                state
                    .hub
                    .emit_to_user(
                        member,
                        &ServerEvent::UnreadUpdate(UnreadCount {
                            room_id: message.room_id,
                            unread_count,
                        }),
                    )
                    .await;
            }
            Err(e) => tracing::warn!("[Messages] Unread count for {} failed: {}", member, e),
        }

        if state.hub.is_viewing(member, message.room_id).await {
            continue;
        }
        let result = notify(
            state,
            NewNotification {
                user_id: member,
                kind: NotificationKind::Message,
                room_id: Some(message.room_id),
                message_id: Some(message.id),
                actor_id: Some(sender.user_id),
                body: &body,
            },
        )
        .await;
        if let Err(e) = result {
            tracing::warn!("[Messages] Notification for {} failed: {}", member, e);
        }
    }
}
