//! Database operations for rooms and memberships

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::shared::messaging::{MemberRole, Room, RoomKind, RoomMember};

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    kind: String,
    name: Option<String>,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            kind: RoomKind::parse(&row.kind),
            name: row.name,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_message_at: row.last_message_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    username: String,
    display_name: Option<String>,
    role: String,
    joined_at: DateTime<Utc>,
    last_read_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for RoomMember {
    fn from(row: MemberRow) -> Self {
        RoomMember {
            user_id: row.user_id,
            username: row.username,
            display_name: row.display_name,
            role: MemberRole::parse(&row.role),
            joined_at: row.joined_at,
            last_read_at: row.last_read_at,
            online: false,
        }
    }
}

/// A user's membership row in one room
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Membership {
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub last_read_message_id: Option<Uuid>,
}

impl Membership {
    pub fn role(&self) -> MemberRole {
        MemberRole::parse(&self.role)
    }
}

const ROOM_COLUMNS: &str = "id, kind, name, owner_id, created_at, updated_at, last_message_at";

/// Insert a room
///
/// A second direct room for the same pair fails with a unique violation on
/// `direct_key`.
pub async fn create_room(
    executor: impl SqliteExecutor<'_>,
    kind: RoomKind,
    name: Option<&str>,
    owner_id: Option<Uuid>,
    direct_key: Option<&str>,
) -> Result<Room, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as::<_, RoomRow>(&format!(
        r#"
        INSERT INTO rooms (id, kind, name, owner_id, direct_key, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        ROOM_COLUMNS
    ))
    .bind(id)
    .bind(kind.as_str())
    .bind(name)
    .bind(owner_id)
    .bind(direct_key)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

/// Create a room together with its initial members in one transaction
///
/// Either the room and every membership row are stored, or nothing is.
pub async fn create_room_with_members(
    pool: &SqlitePool,
    kind: RoomKind,
    name: Option<&str>,
    owner_id: Option<Uuid>,
    direct_key: Option<&str>,
    members: &[(Uuid, MemberRole)],
) -> Result<Room, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let room = create_room(&mut *tx, kind, name, owner_id, direct_key).await?;
    for (user_id, role) in members {
        add_member(&mut *tx, room.id, *user_id, *role, None).await?;
    }
    tx.commit().await?;
    Ok(room)
}

pub async fn get_room(pool: &SqlitePool, room_id: Uuid) -> Result<Option<Room>, sqlx::Error> {
    let row = sqlx::query_as::<_, RoomRow>(&format!(
        "SELECT {} FROM rooms WHERE id = ?",
        ROOM_COLUMNS
    ))
    .bind(room_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Room::from))
}

pub async fn get_direct_room(pool: &SqlitePool, direct_key: &str) -> Result<Option<Room>, sqlx::Error> {
    let row = sqlx::query_as::<_, RoomRow>(&format!(
        "SELECT {} FROM rooms WHERE direct_key = ?",
        ROOM_COLUMNS
    ))
    .bind(direct_key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Room::from))
}

/// Rooms the user belongs to, most recently active first
pub async fn rooms_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Room>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RoomRow>(
        r#"
        SELECT r.id, r.kind, r.name, r.owner_id, r.created_at, r.updated_at, r.last_message_at
        FROM rooms r
        JOIN room_members rm ON rm.room_id = r.id
        WHERE rm.user_id = ?
        ORDER BY COALESCE(r.last_message_at, r.created_at) DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Room::from).collect())
}

pub async fn rename_room(pool: &SqlitePool, room_id: Uuid, name: &str) -> Result<Room, sqlx::Error> {
    let row = sqlx::query_as::<_, RoomRow>(&format!(
        "UPDATE rooms SET name = ?, updated_at = ? WHERE id = ? RETURNING {}",
        ROOM_COLUMNS
    ))
    .bind(name)
    .bind(Utc::now())
    .bind(room_id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn touch_last_message(pool: &SqlitePool, room_id: Uuid, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rooms SET last_message_at = ?, updated_at = ? WHERE id = ?")
        .bind(at)
        .bind(at)
        .bind(room_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Add a member; returns false if they were already in the room
///
/// The read pointer starts at `last_read_message_id` so history from before
/// the join does not count as unread.
pub async fn add_member(
    executor: impl SqliteExecutor<'_>,
    room_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
    last_read_message_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO room_members (room_id, user_id, role, joined_at, last_read_at, last_read_message_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .bind(role.as_str())
    .bind(now)
    .bind(last_read_message_id.map(|_| now))
    .bind(last_read_message_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn remove_member(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn get_membership(
    pool: &SqlitePool,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        r#"
        SELECT role, joined_at, last_read_at, last_read_message_id
        FROM room_members
        WHERE room_id = ? AND user_id = ?
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Members with their profile, in join order
pub async fn list_members(pool: &SqlitePool, room_id: Uuid) -> Result<Vec<RoomMember>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT rm.user_id, u.username, u.display_name, rm.role, rm.joined_at, rm.last_read_at
        FROM room_members rm
        JOIN users u ON u.id = rm.user_id
        WHERE rm.room_id = ?
        ORDER BY rm.joined_at ASC, u.username ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(RoomMember::from).collect())
}

pub async fn member_ids(pool: &SqlitePool, room_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM room_members WHERE room_id = ?")
        .bind(room_id)
        .fetch_all(pool)
        .await
}

/// Everyone who shares at least one room with `user_id`
pub async fn co_member_ids(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT other.user_id
        FROM room_members me
        JOIN room_members other ON other.room_id = me.room_id
        WHERE me.user_id = ?1 AND other.user_id != ?1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Username of the other participant of a direct room
pub async fn direct_partner_name(
    pool: &SqlitePool,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT u.username
        FROM room_members rm
        JOIN users u ON u.id = rm.user_id
        WHERE rm.room_id = ? AND rm.user_id != ?
        LIMIT 1
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
