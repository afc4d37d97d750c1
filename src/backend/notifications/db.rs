//! Database operations for notifications

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::shared::messaging::{Notification, NotificationKind};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    room_id: Option<Uuid>,
    message_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            kind: NotificationKind::parse(&row.kind),
            room_id: row.room_id,
            message_id: row.message_id,
            actor_id: row.actor_id,
            body: row.body,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Fields of a notification about to be stored
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub room_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub body: &'a str,
}

pub async fn insert(pool: &SqlitePool, new: &NewNotification<'_>) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(
        r#"
        INSERT INTO notifications (id, user_id, kind, room_id, message_id, actor_id, body, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
        RETURNING id, user_id, kind, room_id, message_id, actor_id, body, is_read, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.kind.as_str())
    .bind(new.room_id)
    .bind(new.message_id)
    .bind(new.actor_id)
    .bind(new.body)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Newest first
pub async fn list(
    pool: &SqlitePool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT id, user_id, kind, room_id, message_id, actor_id, body, is_read, created_at
        FROM notifications
        WHERE user_id = ? AND (? = 0 OR is_read = 0)
        ORDER BY rowid DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Notification::from).collect())
}

pub async fn unread_count(pool: &SqlitePool, user_id: Uuid) -> Result<u32, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Returns false when the notification does not exist or belongs to someone else
pub async fn mark_read(pool: &SqlitePool, user_id: Uuid, notification_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_all_read(pool: &SqlitePool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn mark_room_read(pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ? AND room_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .bind(room_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
