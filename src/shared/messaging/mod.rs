//! Messaging Module
//!
//! Data structures for the chat domain:
//!
//! - `Room` / `RoomSummary` / `RoomMember` - direct and group rooms
//! - `ChatMessage` - a message in a room
//! - `ReactionSummary` - aggregated emoji reactions
//! - `Notification` - per-user notifications
//!
//! # Usage
//!
//! ```rust
//! use roomline::shared::messaging::{ChatMessage, Room, RoomKind};
//! ```

pub mod message;
pub mod notification;
pub mod reaction;
pub mod room;

pub use message::{
    normalize_content, ChatMessage, EditMessageRequest, ListMessagesQuery, ListMessagesResponse,
    MarkReadRequest, MessageKind, ReadReceipt, SendMessageRequest, UnreadCount, MAX_PAGE_SIZE,
};
pub use notification::{
    ListNotificationsQuery, ListNotificationsResponse, Notification, NotificationCount,
    NotificationKind,
};
pub use reaction::{summarize, validate_emoji, ReactionSummary, ReactionUpdate, ToggleReactionRequest};
pub use room::{
    direct_key, normalize_room_name, AddMemberRequest, CreateRoomRequest, MemberRole,
    OpenDirectRequest, RenameRoomRequest, Room, RoomDetail, RoomKind, RoomMember, RoomSummary,
};
