//! Notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// New message in a room the user was not viewing
    Message,
    /// Someone reacted to the user's message
    Reaction,
    /// The user was added to a room
    RoomInvite,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::Reaction => "reaction",
            NotificationKind::RoomInvite => "room_invite",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "reaction" => NotificationKind::Reaction,
            "room_invite" => NotificationKind::RoomInvite,
            _ => NotificationKind::Message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub room_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing notifications
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationCount {
    pub unread_count: u32,
}
