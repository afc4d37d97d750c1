//! Room Data Structures
//!
//! A room is either a direct conversation between two users or a named
//! group owned by its creator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::ChatMessage;
use crate::shared::error::SharedError;

/// Maximum room name length (characters)
pub const MAX_ROOM_NAME_LEN: usize = 80;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Direct,
    Group,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Direct => "direct",
            RoomKind::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "direct" => RoomKind::Direct,
            _ => RoomKind::Group,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "owner" => MemberRole::Owner,
            _ => MemberRole::Member,
        }
    }
}

/// Room record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: Uuid,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Last time anything was posted, falling back to creation time
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// Room as listed in the sidebar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub room: Room,
    /// For direct rooms: the other participant's username
    pub title: String,
    pub unread_count: u32,
    pub last_message: Option<ChatMessage>,
}

/// Member of a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomMember {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub online: bool,
}

/// Room with its member list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomDetail {
    pub room: Room,
    pub members: Vec<RoomMember>,
}

/// Request to create a group room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Request to open (or reuse) a direct room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDirectRequest {
    pub user_id: Uuid,
}

/// Request to rename a group room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRoomRequest {
    pub name: String,
}

/// Request to add a member to a group room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Trim and check a room name
pub fn normalize_room_name(name: &str) -> Result<String, SharedError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation("name", "Room name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(SharedError::validation(
            "name",
            format!("Room name must be at most {} characters", MAX_ROOM_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// Stable key identifying the direct room between two users, independent of order
pub fn direct_key(a: Uuid, b: Uuid) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}
