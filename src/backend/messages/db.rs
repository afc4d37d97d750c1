//! Database operations for messages and read pointers
//!
//! Messages carry an autoincrement `seq` alongside their UUID. Paging,
//! "latest message" and the read pointer all compare `seq`, never
//! timestamps, so two messages in the same instant still have a strict
//! order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::shared::messaging::{summarize, ChatMessage, MessageKind, ReactionSummary};

/// A stored message with its ordering key
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRecord {
    pub seq: i64,
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub kind: String,
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn kind(&self) -> MessageKind {
        MessageKind::parse(&self.kind)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Wire form; deleted messages become tombstones with no content
    pub fn into_message(self, reactions: Vec<ReactionSummary>) -> ChatMessage {
        let deleted = self.deleted_at.is_some();
        ChatMessage {
            id: self.id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            sender_username: self.sender_username,
            content: if deleted { String::new() } else { self.content },
            kind: MessageKind::parse(&self.kind),
            reply_to: self.reply_to,
            created_at: self.created_at,
            edited_at: self.edited_at,
            deleted,
            reactions: if deleted { Vec::new() } else { reactions },
        }
    }
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.seq, m.id, m.room_id, m.sender_id, u.username AS sender_username,
           m.content, m.kind, m.reply_to, m.created_at, m.edited_at, m.deleted_at
    FROM messages m
    JOIN users u ON u.id = m.sender_id
"#;

pub async fn insert_message(
    pool: &SqlitePool,
    room_id: Uuid,
    sender_id: Uuid,
    content: &str,
    kind: MessageKind,
    reply_to: Option<Uuid>,
) -> Result<MessageRecord, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO messages (id, room_id, sender_id, content, kind, reply_to, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(room_id)
    .bind(sender_id)
    .bind(content)
    .bind(kind.as_str())
    .bind(reply_to)
    .bind(now)
    .execute(pool)
    .await?;

    get_message(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_message(pool: &SqlitePool, message_id: Uuid) -> Result<Option<MessageRecord>, sqlx::Error> {
    sqlx::query_as::<_, MessageRecord>(&format!("{} WHERE m.id = ?", MESSAGE_SELECT))
        .bind(message_id)
        .fetch_optional(pool)
        .await
}

/// Newest-first page of at most `limit` messages, optionally older than `before_seq`
pub async fn page(
    pool: &SqlitePool,
    room_id: Uuid,
    before_seq: Option<i64>,
    limit: i64,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    sqlx::query_as::<_, MessageRecord>(&format!(
        "{} WHERE m.room_id = ? AND m.seq < ? ORDER BY m.seq DESC LIMIT ?",
        MESSAGE_SELECT
    ))
    .bind(room_id)
    .bind(before_seq.unwrap_or(i64::MAX))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Most recent message of a room, deleted or not
pub async fn latest_message(pool: &SqlitePool, room_id: Uuid) -> Result<Option<MessageRecord>, sqlx::Error> {
    sqlx::query_as::<_, MessageRecord>(&format!(
        "{} WHERE m.room_id = ? ORDER BY m.seq DESC LIMIT 1",
        MESSAGE_SELECT
    ))
    .bind(room_id)
    .fetch_optional(pool)
    .await
}

pub async fn update_content(
    pool: &SqlitePool,
    message_id: Uuid,
    content: &str,
    edited_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET content = ?, edited_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(content)
        .bind(edited_at)
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete(pool: &SqlitePool, message_id: Uuid, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE messages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(at)
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Messages after the user's read pointer that count as unread
///
/// Excludes the user's own messages, deleted messages and system messages.
pub async fn unread_count(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> Result<u32, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM messages m
        WHERE m.room_id = ?1
          AND m.sender_id != ?2
          AND m.deleted_at IS NULL
          AND m.kind != 'system'
          AND m.seq > COALESCE((
              SELECT pm.seq
              FROM room_members rm
              JOIN messages pm ON pm.id = rm.last_read_message_id
              WHERE rm.room_id = ?1 AND rm.user_id = ?2
          ), 0)
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Move the read pointer to `message`, only if that is forward
///
/// Returns whether the pointer moved.
pub async fn advance_read_pointer(
    pool: &SqlitePool,
    room_id: Uuid,
    user_id: Uuid,
    message: &MessageRecord,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE room_members
        SET last_read_message_id = ?1, last_read_at = ?2
        WHERE room_id = ?3 AND user_id = ?4
          AND COALESCE((SELECT seq FROM messages WHERE id = room_members.last_read_message_id), 0) < ?5
        "#,
    )
    .bind(message.id)
    .bind(at)
    .bind(room_id)
    .bind(user_id)
    .bind(message.seq)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Reactions for every message in a seq range of one room, keyed by message
pub async fn reactions_for_range(
    pool: &SqlitePool,
    room_id: Uuid,
    min_seq: i64,
    max_seq: i64,
) -> Result<HashMap<Uuid, Vec<ReactionSummary>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid, String, Uuid)>(
        r#"
        SELECT r.message_id, r.emoji, r.user_id
        FROM reactions r
        JOIN messages m ON m.id = r.message_id
        WHERE m.room_id = ? AND m.seq BETWEEN ? AND ?
        ORDER BY r.rowid ASC
        "#,
    )
    .bind(room_id)
    .bind(min_seq)
    .bind(max_seq)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<(String, Uuid)>> = HashMap::new();
    for (message_id, emoji, user_id) in rows {
        grouped.entry(message_id).or_default().push((emoji, user_id));
    }
    Ok(grouped
        .into_iter()
        .map(|(message_id, rows)| (message_id, summarize(rows)))
        .collect())
}
