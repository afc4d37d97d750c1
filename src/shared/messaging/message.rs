//! Chat Message Data Structure
//!
//! Represents a message in a room, plus the request/response bodies for
//! sending, editing, paging and acknowledging messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reaction::ReactionSummary;
use crate::shared::error::SharedError;

/// Hard cap on a history page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Type of message content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text written by a member
    #[default]
    Text,
    /// Generated by the server (e.g. "alice joined")
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::System => "system",
        }
    }

    /// Parse from the stored column value; unknown values read as text
    pub fn parse(s: &str) -> Self {
        match s {
            "system" => MessageKind::System,
            _ => MessageKind::Text,
        }
    }
}

/// A chat message as delivered to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    /// Empty for deleted messages
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<ReactionSummary>,
}

impl ChatMessage {
    /// First `max_len` characters of the content, with an ellipsis when cut
    pub fn preview(&self, max_len: usize) -> String {
        if self.deleted {
            return "message deleted".to_string();
        }
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let mut preview: String = self.content.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Request to send a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
    /// Client-generated id used to de-duplicate retries
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Request to edit a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

/// Trim and check message content against the configured length limit
pub fn normalize_content(content: &str, max_len: usize) -> Result<String, SharedError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation("content", "Message cannot be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(SharedError::validation(
            "content",
            format!("Message must be at most {} characters", max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// Query parameters for paging through history
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListMessagesQuery {
    /// Return messages older than this message
    #[serde(default)]
    pub before: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ListMessagesQuery {
    pub fn effective_limit(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Response for listing messages (chronological order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}

/// Request to move the caller's read pointer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarkReadRequest {
    /// Read up to this message; the latest message when absent
    #[serde(default)]
    pub message_id: Option<Uuid>,
}

/// Result of a read-pointer update, also broadcast to the room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadReceipt {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub last_read_message_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
}

/// Unread counter for one room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadCount {
    pub room_id: Uuid,
    pub unread_count: u32,
}
