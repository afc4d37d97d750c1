//! Database operations for reactions

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::shared::messaging::{summarize, ReactionSummary};

/// Flip the (message, user, emoji) row; returns true if it now exists
pub async fn toggle(pool: &SqlitePool, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<bool, sqlx::Error> {
    let removed = sqlx::query("DELETE FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?")
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(pool)
        .await?;
    if removed.rows_affected() > 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO reactions (message_id, user_id, emoji, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(message_id)
    .bind(user_id)
    .bind(emoji)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(true)
}

/// Aggregated reactions of one message in first-use order
pub async fn summary(pool: &SqlitePool, message_id: Uuid) -> Result<Vec<ReactionSummary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, Uuid)>(
        "SELECT emoji, user_id FROM reactions WHERE message_id = ? ORDER BY rowid ASC",
    )
    .bind(message_id)
    .fetch_all(pool)
    .await?;
    Ok(summarize(rows))
}
