//! Room operations
//!
//! Every room-scoped operation in the backend, REST or gateway, goes through
//! [`ensure_member`] first.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::db::{self, Membership};
use crate::backend::auth::users;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::messages::db as message_db;
use crate::backend::messages::service::post_system_message;
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::{db::NewNotification, notify};
use crate::backend::realtime::presence;
use crate::backend::server::state::AppState;
use crate::shared::event::{MemberEvent, ServerEvent};
use crate::shared::messaging::{
    direct_key, normalize_room_name, MemberRole, NotificationKind, Room, RoomDetail, RoomKind,
    RoomMember, RoomSummary,
};

/// Load a room and the caller's membership in it
///
/// Unknown room is 404, existing room the user is not in is 403.
pub async fn ensure_member(state: &AppState, room_id: Uuid, user_id: Uuid) -> BackendResult<(Room, Membership)> {
    let room = db::get_room(&state.db_pool, room_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Room not found"))?;

    let membership = db::get_membership(&state.db_pool, room_id, user_id)
        .await?
        .ok_or_else(|| {
            tracing::debug!("[Rooms] {} is not a member of {}", user_id, room_id);
            BackendError::forbidden("Not a member of this room")
        })?;

    Ok((room, membership))
}

/// Create a group room owned by the caller
pub async fn create_group(
    state: &AppState,
    user: &AuthUser,
    name: &str,
    member_ids: &[Uuid],
) -> BackendResult<RoomDetail> {
    let name = normalize_room_name(name)?;

    let invitees: BTreeSet<Uuid> = member_ids
        .iter()
        .copied()
        .filter(|id| *id != user.user_id)
        .collect();
    for id in &invitees {
        users::require_user(&state.db_pool, *id).await?;
    }

    let members: Vec<(Uuid, MemberRole)> = std::iter::once((user.user_id, MemberRole::Owner))
        .chain(invitees.iter().map(|id| (*id, MemberRole::Member)))
        .collect();
    let room = db::create_room_with_members(
        &state.db_pool,
        RoomKind::Group,
        Some(&name),
        Some(user.user_id),
        None,
        &members,
    )
    .await?;

    tracing::info!(
        "[Rooms] {} created group {} ({}) with {} invitee(s)",
        user.username,
        room.id,
        name,
        invitees.len()
    );

    state
        .hub
        .emit_to_user(user.user_id, &ServerEvent::RoomAdded(room.clone()))
        .await;
    for id in &invitees {
        invite(state, &room, user, *id).await;
    }

    let members = members_with_presence(state, room.id).await?;
    Ok(RoomDetail { room, members })
}

/// Return the direct room between the caller and `other`, creating it if needed
pub async fn open_direct(state: &AppState, user: &AuthUser, other: Uuid) -> BackendResult<Room> {
    if other == user.user_id {
        return Err(BackendError::bad_request("Cannot open a direct room with yourself"));
    }
    users::require_user(&state.db_pool, other).await?;

    let key = direct_key(user.user_id, other);
    if let Some(room) = db::get_direct_room(&state.db_pool, &key).await? {
        return Ok(room);
    }

    let members = [(user.user_id, MemberRole::Member), (other, MemberRole::Member)];
    let room = match db::create_room_with_members(&state.db_pool, RoomKind::Direct, None, None, Some(&key), &members)
        .await
    {
        Ok(room) => room,
        // Lost a race with the other participant opening the same room
        Err(e) if is_unique_violation(&e) => {
            return db::get_direct_room(&state.db_pool, &key)
                .await?
                .ok_or_else(|| BackendError::state("Direct room vanished after conflict"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("[Rooms] Direct room {} opened between {} and {}", room.id, user.user_id, other);

    state
        .hub
        .emit_to_users(&[user.user_id, other], &ServerEvent::RoomAdded(room.clone()))
        .await;

    Ok(room)
}

/// Sidebar listing: every room of the caller with unread count and last message
pub async fn list_rooms(state: &AppState, user: &AuthUser) -> BackendResult<Vec<RoomSummary>> {
    let rooms = db::rooms_for_user(&state.db_pool, user.user_id).await?;
    let mut summaries = Vec::with_capacity(rooms.len());

    for room in rooms {
        let unread_count = message_db::unread_count(&state.db_pool, room.id, user.user_id).await?;
        let last_message = message_db::latest_message(&state.db_pool, room.id)
            .await?
            .map(|record| record.into_message(Vec::new()));
        let title = room_title(state, &room, user.user_id).await?;
        summaries.push(RoomSummary {
            room,
            title,
            unread_count,
            last_message,
        });
    }

    Ok(summaries)
}

pub async fn get_room(state: &AppState, user: &AuthUser, room_id: Uuid) -> BackendResult<RoomDetail> {
    let (room, _) = ensure_member(state, room_id, user.user_id).await?;
    let members = members_with_presence(state, room_id).await?;
    Ok(RoomDetail { room, members })
}

pub async fn members(state: &AppState, user: &AuthUser, room_id: Uuid) -> BackendResult<Vec<RoomMember>> {
    ensure_member(state, room_id, user.user_id).await?;
    members_with_presence(state, room_id).await
}

/// Rename a group room; owner only
pub async fn rename_room(state: &AppState, user: &AuthUser, room_id: Uuid, name: &str) -> BackendResult<Room> {
    let (room, membership) = ensure_member(state, room_id, user.user_id).await?;
    require_group_owner(&room, &membership)?;
    let name = normalize_room_name(name)?;

    let room = db::rename_room(&state.db_pool, room_id, &name).await?;
    tracing::info!("[Rooms] {} renamed {} to {}", user.username, room_id, name);

    let member_ids = db::member_ids(&state.db_pool, room_id).await?;
    state
        .hub
        .emit_to_users(&member_ids, &ServerEvent::RoomUpdated(room.clone()))
        .await;

    Ok(room)
}

/// Add a user to a group room; owner only
pub async fn add_member(state: &AppState, user: &AuthUser, room_id: Uuid, new_member: Uuid) -> BackendResult<RoomMember> {
    let (room, membership) = ensure_member(state, room_id, user.user_id).await?;
    require_group_owner(&room, &membership)?;
    let invitee = users::require_user(&state.db_pool, new_member).await?;

    // Start the newcomer's read pointer at the current tail
    let latest = message_db::latest_message(&state.db_pool, room_id).await?;
    let added = db::add_member(
        &state.db_pool,
        room_id,
        new_member,
        MemberRole::Member,
        latest.map(|m| m.id),
    )
    .await?;
    if !added {
        return Err(BackendError::conflict("User is already a member"));
    }

    tracing::info!("[Rooms] {} added {} to {}", user.username, invitee.username, room_id);

    post_system_message(
        state,
        &room,
        user.user_id,
        &format!("{} added {}", user.username, invitee.username),
    )
    .await?;

    state
        .hub
        .emit_to_room(
            room_id,
            &ServerEvent::RoomMemberJoined(MemberEvent {
                room_id,
                user_id: invitee.id,
                username: invitee.username.clone(),
            }),
            None,
        )
        .await;
    invite(state, &room, user, invitee.id).await;

    members_with_presence(state, room_id)
        .await?
        .into_iter()
        .find(|m| m.user_id == new_member)
        .ok_or_else(|| BackendError::state("Member missing after insert"))
}

/// Leave a room, or remove someone from it as the owner
pub async fn remove_member(state: &AppState, user: &AuthUser, room_id: Uuid, target: Uuid) -> BackendResult<()> {
    let (room, membership) = ensure_member(state, room_id, user.user_id).await?;
    if room.kind == RoomKind::Direct {
        return Err(BackendError::bad_request("Direct rooms cannot be left"));
    }

    let leaving = target == user.user_id;
    if leaving && membership.role() == MemberRole::Owner {
        return Err(BackendError::bad_request("The owner cannot leave the room"));
    }
    if !leaving && membership.role() != MemberRole::Owner {
        return Err(BackendError::forbidden("Only the owner can remove members"));
    }

    let removed_user = users::require_user(&state.db_pool, target).await?;
    if !db::remove_member(&state.db_pool, room_id, target).await? {
        return Err(BackendError::not_found("User is not a member of this room"));
    }

    let text = if leaving {
        format!("{} left", removed_user.username)
    } else {
        format!("{} removed {}", user.username, removed_user.username)
    };
    tracing::info!("[Rooms] {} in {}", text, room_id);
    post_system_message(state, &room, user.user_id, &text).await?;

    let event = ServerEvent::RoomMemberLeft(MemberEvent {
        room_id,
        user_id: target,
        username: removed_user.username,
    });
    state.hub.evict_user_from_room(target, room_id).await;
    state.hub.emit_to_room(room_id, &event, None).await;

    Ok(())
}

async fn invite(state: &AppState, room: &Room, actor: &AuthUser, invitee: Uuid) {
    state
        .hub
        .emit_to_user(invitee, &ServerEvent::RoomAdded(room.clone()))
        .await;

    let body = format!(
        "{} added you to {}",
        actor.username,
        room.name.as_deref().unwrap_or("a room")
    );
    let result = notify(
        state,
        NewNotification {
            user_id: invitee,
            kind: NotificationKind::RoomInvite,
            room_id: Some(room.id),
            message_id: None,
            actor_id: Some(actor.user_id),
            body: &body,
        },
    )
    .await;
    if let Err(e) = result {
        tracing::warn!("[Rooms] Failed to notify {} of invite to {}: {}", invitee, room.id, e);
    }
}

async fn members_with_presence(state: &AppState, room_id: Uuid) -> BackendResult<Vec<RoomMember>> {
    let mut members = db::list_members(&state.db_pool, room_id).await?;
    for member in &mut members {
        member.online = presence::is_online(state, member.user_id);
    }
    Ok(members)
}

async fn room_title(state: &AppState, room: &Room, user_id: Uuid) -> BackendResult<String> {
    match room.kind {
        RoomKind::Group => Ok(room.name.clone().unwrap_or_default()),
        RoomKind::Direct => Ok(db::direct_partner_name(&state.db_pool, room.id, user_id)
            .await?
            .unwrap_or_default()),
    }
}

fn require_group_owner(room: &Room, membership: &Membership) -> BackendResult<()> {
    if room.kind != RoomKind::Group {
        return Err(BackendError::bad_request("Only group rooms support this operation"));
    }
    if membership.role() != MemberRole::Owner {
        return Err(BackendError::forbidden("Only the room owner can do this"));
    }
    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
