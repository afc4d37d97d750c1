/**
 * Gateway Event Protocol
 *
 * JSON frames exchanged over the `/ws` socket. Every frame is an object
 * `{"event": <name>, "data": <payload>}`; client frames may also carry an
 * `id` that the server echoes in its `ack` or `error` reply.
 *
 * Both enums are adjacently tagged so the event name and payload sit side by
 * side exactly as they appear on the wire.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::messaging::{
    ChatMessage, Notification, ReactionUpdate, Room, UnreadCount,
};

/// Raw client frame before the event name is resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ClientFrame {
    /// Decode a text frame
    pub fn from_text(text: &str) -> Result<Self, SharedError> {
        serde_json::from_str(text).map_err(|e| SharedError::serialization(format!("Malformed frame: {}", e)))
    }

    /// Wrap a typed event, attaching an optional correlation id
    pub fn from_event(event: &ClientEvent, id: Option<String>) -> Result<Self, SharedError> {
        let mut value = serde_json::to_value(event)?;
        let name = value
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SharedError::serialization("Event without a name"))?;
        let data = value.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        Ok(Self { event: name, data, id })
    }

    /// Resolve the event name and payload into a typed event
    pub fn parse(&self) -> Result<ClientEvent, SharedError> {
        if self.event == "ping" {
            return Ok(ClientEvent::Ping);
        }
        let tagged = serde_json::json!({ "event": self.event, "data": self.data });
        serde_json::from_value(tagged).map_err(|e| {
            SharedError::validation("data", format!("Invalid '{}' payload: {}", self.event, e))
        })
    }

    pub fn to_text(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Events a client may send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:join")]
    RoomJoin(RoomRef),
    #[serde(rename = "room:leave")]
    RoomLeave(RoomRef),
    #[serde(rename = "message:send")]
    MessageSend(SendMessagePayload),
    #[serde(rename = "message:edit")]
    MessageEdit(EditMessagePayload),
    #[serde(rename = "message:delete")]
    MessageDelete(MessageRef),
    #[serde(rename = "message:read")]
    MessageRead(ReadPayload),
    #[serde(rename = "typing")]
    Typing(TypingPayload),
    #[serde(rename = "reaction:toggle")]
    ReactionToggle(ReactionTogglePayload),
    #[serde(rename = "auth:refresh")]
    AuthRefresh(AuthRefreshPayload),
    #[serde(rename = "ping")]
    Ping,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RoomJoin(_) => "room:join",
            ClientEvent::RoomLeave(_) => "room:leave",
            ClientEvent::MessageSend(_) => "message:send",
            ClientEvent::MessageEdit(_) => "message:edit",
            ClientEvent::MessageDelete(_) => "message:delete",
            ClientEvent::MessageRead(_) => "message:read",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::ReactionToggle(_) => "reaction:toggle",
            ClientEvent::AuthRefresh(_) => "auth:refresh",
            ClientEvent::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomRef {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRef {
    pub message_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessagePayload {
    pub room_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditMessagePayload {
    pub message_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadPayload {
    pub room_id: Uuid,
    #[serde(default)]
    pub message_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingPayload {
    pub room_id: Uuid,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionTogglePayload {
    pub message_id: Uuid,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRefreshPayload {
    pub access_token: String,
}

/// Events the server pushes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(ConnectedPayload),
    #[serde(rename = "ack")]
    Ack(AckPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "message:new")]
    MessageNew(ChatMessage),
    #[serde(rename = "message:updated")]
    MessageUpdated(ChatMessage),
    #[serde(rename = "message:deleted")]
    MessageDeleted(MessageDeletedPayload),
    #[serde(rename = "message:read")]
    MessageRead(ReadReceiptPayload),
    #[serde(rename = "unread:update")]
    UnreadUpdate(UnreadCount),
    #[serde(rename = "typing")]
    Typing(TypingEvent),
    #[serde(rename = "reaction:updated")]
    ReactionUpdated(ReactionUpdate),
    #[serde(rename = "notification:new")]
    NotificationNew(Notification),
    #[serde(rename = "presence")]
    Presence(PresencePayload),
    #[serde(rename = "room:added")]
    RoomAdded(Room),
    #[serde(rename = "room:updated")]
    RoomUpdated(Room),
    #[serde(rename = "room:member_joined")]
    RoomMemberJoined(MemberEvent),
    #[serde(rename = "room:member_left")]
    RoomMemberLeft(MemberEvent),
    #[serde(rename = "room:removed")]
    RoomRemoved(RoomRef),
    #[serde(rename = "auth:expiring")]
    AuthExpiring(ExpiryPayload),
    #[serde(rename = "auth:refreshed")]
    AuthRefreshed(ExpiryPayload),
    #[serde(rename = "auth:expired")]
    AuthExpired(AuthExpiredPayload),
}

impl ServerEvent {
    pub fn ack(id: impl Into<String>, result: Value) -> Self {
        ServerEvent::Ack(AckPayload { id: id.into(), result })
    }

    pub fn error(id: Option<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload {
            id,
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected(_) => "connected",
            ServerEvent::Ack(_) => "ack",
            ServerEvent::Error(_) => "error",
            ServerEvent::Pong => "pong",
            ServerEvent::MessageNew(_) => "message:new",
            ServerEvent::MessageUpdated(_) => "message:updated",
            ServerEvent::MessageDeleted(_) => "message:deleted",
            ServerEvent::MessageRead(_) => "message:read",
            ServerEvent::UnreadUpdate(_) => "unread:update",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::ReactionUpdated(_) => "reaction:updated",
            ServerEvent::NotificationNew(_) => "notification:new",
            ServerEvent::Presence(_) => "presence",
            ServerEvent::RoomAdded(_) => "room:added",
            ServerEvent::RoomUpdated(_) => "room:updated",
            ServerEvent::RoomMemberJoined(_) => "room:member_joined",
            ServerEvent::RoomMemberLeft(_) => "room:member_left",
            ServerEvent::RoomRemoved(_) => "room:removed",
            ServerEvent::AuthExpiring(_) => "auth:expiring",
            ServerEvent::AuthRefreshed(_) => "auth:refreshed",
            ServerEvent::AuthExpired(_) => "auth:expired",
        }
    }

    pub fn to_text(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectedPayload {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    /// When the access token used for this socket expires
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AckPayload {
    pub id: String,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDeletedPayload {
    pub room_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadReceiptPayload {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub message_id: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingEvent {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresencePayload {
    pub user_id: Uuid,
    pub online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberEvent {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpiryPayload {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthExpiredPayload {
    pub reason: String,
}
