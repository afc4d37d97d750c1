//! Client event dispatch
//!
//! Decodes a text frame, runs the matching service operation as the
//! socket's user and answers through the connection's queue: `ack` with the
//! operation's result when the frame carried an `id`, `error` otherwise.

use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use super::connection::GatewaySession;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::messages::{receipts, service as messages};
use crate::backend::reactions::service as reactions;
use crate::backend::rooms::ensure_member;
use crate::backend::server::state::AppState;
use crate::shared::event::{ClientEvent, ClientFrame, ExpiryPayload, ServerEvent, TypingEvent};
use crate::shared::messaging::SendMessageRequest;

/// Minimum gap between two `typing: true` broadcasts per user and room
pub const TYPING_THROTTLE: Duration = Duration::from_secs(3);

fn typing_key(room_id: Uuid, user_id: Uuid) -> String {
    format!("typing:{}:{}", room_id, user_id)
}

/// Handle one text frame from the socket
pub async fn handle_text(state: &AppState, session: &mut GatewaySession, text: &str) {
    let conn_id = session.conn_id;

    let frame = match ClientFrame::from_text(text) {
        Ok(frame) => frame,
        Err(e) => {
            let err = BackendError::protocol(e.to_string());
            reply(state, conn_id, ServerEvent::error(None, err.code(), err.message())).await;
            return;
        }
    };
    let id = frame.id.clone();

    let event = match frame.parse() {
        Ok(event) => event,
        Err(e) => {
            let err = BackendError::from(e);
            tracing::debug!("[Gateway] Rejected '{}' frame: {}", frame.event, err);
            reply(state, conn_id, ServerEvent::error(id, err.code(), err.message())).await;
            return;
        }
    };

    let name = event.name();
    match handle_event(state, session, event).await {
        Ok(result) => {
            if let Some(id) = id {
                reply(state, conn_id, ServerEvent::ack(id, result)).await;
            }
        }
        Err(e) => {
            if e.is_server_error() {
                tracing::error!("[Gateway] {} failed: {}", name, e);
            } else {
                tracing::debug!("[Gateway] {} refused: {}", name, e);
            }
            reply(state, conn_id, ServerEvent::error(id, e.code(), e.message())).await;
        }
    }
}

async fn handle_event(state: &AppState, session: &mut GatewaySession, event: ClientEvent) -> BackendResult<Value> {
    let conn_id = session.conn_id;
    let user = &session.user;

    match event {
        ClientEvent::RoomJoin(room) => {
            ensure_member(state, room.room_id, user.user_id).await?;
            state.hub.join_room(conn_id, room.room_id).await;
            let unread = receipts::unread_count(state, user, room.room_id).await?;
            tracing::debug!("[Gateway] Joined room {}", room.room_id);
            Ok(serde_json::to_value(unread)?)
        }
        ClientEvent::RoomLeave(room) => {
            let left = state.hub.leave_room(conn_id, room.room_id).await;
            Ok(json!({ "room_id": room.room_id, "left": left }))
        }
        ClientEvent::MessageSend(payload) => {
            let request = SendMessageRequest {
                content: payload.content,
                reply_to: payload.reply_to,
                client_id: payload.client_id,
            };
            let message = messages::send(state, user, payload.room_id, request).await?;
            // Sending implies the user stopped typing
            state.cache.delete(&typing_key(payload.room_id, user.user_id));
            Ok(serde_json::to_value(message)?)
        }
        ClientEvent::MessageEdit(payload) => {
            let message = messages::edit(state, user, payload.message_id, &payload.content).await?;
            Ok(serde_json::to_value(message)?)
        }
        ClientEvent::MessageDelete(payload) => {
            messages::delete(state, user, payload.message_id).await?;
            Ok(json!({ "message_id": payload.message_id }))
        }
        ClientEvent::MessageRead(payload) => {
            let receipt = receipts::mark_read(state, user, payload.room_id, payload.message_id).await?;
            Ok(serde_json::to_value(receipt)?)
        }
        ClientEvent::Typing(payload) => {
            if !state.hub.is_in_room(conn_id, payload.room_id).await {
                return Err(BackendError::forbidden("Join the room before sending typing events"));
            }
            let key = typing_key(payload.room_id, user.user_id);
            let broadcast = if payload.is_typing {
                if state.cache.exists(&key) {
                    false
                } else {
                    state.cache.set(key, "1", Some(TYPING_THROTTLE));
                    true
                }
            } else {
                state.cache.delete(&key);
                true
            };

            if broadcast {
                state
                    .hub
                    .emit_to_room(
                        payload.room_id,
                        &ServerEvent::Typing(TypingEvent {
                            room_id: payload.room_id,
                            user_id: user.user_id,
                            username: user.username.clone(),
                            is_typing: payload.is_typing,
                        }),
                        Some(user.user_id),
                    )
                    .await;
            }
            Ok(json!({ "broadcast": broadcast }))
        }
        ClientEvent::ReactionToggle(payload) => {
            let update = reactions::toggle(state, user, payload.message_id, &payload.emoji).await?;
            Ok(serde_json::to_value(update)?)
        }
        ClientEvent::AuthRefresh(payload) => {
            let claims = state.sessions.verify_access(&payload.access_token)?;
            if claims.sub != user.user_id {
                return Err(BackendError::forbidden("Token belongs to a different user"));
            }
            let expires_at = claims.expires_at();
            session.extend(claims);
            tracing::info!("[Gateway] Session extended until {}", expires_at);
            reply(state, conn_id, ServerEvent::AuthRefreshed(ExpiryPayload { expires_at })).await;
            Ok(json!({ "expires_at": expires_at }))
        }
        ClientEvent::Ping => {
            reply(state, conn_id, ServerEvent::Pong).await;
            Ok(Value::Null)
        }
    }
}

async fn reply(state: &AppState, conn_id: Uuid, event: ServerEvent) {
    if !state.hub.emit_to_connection(conn_id, &event).await {
        tracing::debug!("[Gateway] Dropped {} for closed connection", event.name());
    }
}
