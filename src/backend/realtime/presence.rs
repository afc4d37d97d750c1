//! Presence
//!
//! Online state lives in the cache: `presence:{user}` while at least one
//! gateway connection is open, `last_seen:{user}` (RFC 3339) once the last
//! one closes. Transitions are pushed to everyone sharing a room with the
//! user.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::rooms::db::co_member_ids;
use crate::backend::server::state::AppState;
use crate::shared::event::{PresencePayload, ServerEvent};

fn presence_key(user_id: Uuid) -> String {
    format!("presence:{}", user_id)
}

fn last_seen_key(user_id: Uuid) -> String {
    format!("last_seen:{}", user_id)
}

pub fn is_online(state: &AppState, user_id: Uuid) -> bool {
    state.cache.exists(&presence_key(user_id))
}

pub fn last_seen(state: &AppState, user_id: Uuid) -> Option<DateTime<Utc>> {
    state
        .cache
        .get(&last_seen_key(user_id))
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|at| at.with_timezone(&Utc))
}

/// First connection of a user opened
pub async fn mark_online(state: &AppState, user_id: Uuid) {
    state
        .cache
        .set(presence_key(user_id), Utc::now().to_rfc3339(), None);
    broadcast(state, PresencePayload {
        user_id,
        online: true,
        last_seen: None,
    })
    .await;
}

/// Last connection of a user closed
pub async fn mark_offline(state: &AppState, user_id: Uuid) {
    let now = Utc::now();
    state.cache.delete(&presence_key(user_id));
    state.cache.set(last_seen_key(user_id), now.to_rfc3339(), None);
    broadcast(state, PresencePayload {
        user_id,
        online: false,
        last_seen: Some(now),
    })
    .await;
}

async fn broadcast(state: &AppState, payload: PresencePayload) {
    let user_id = payload.user_id;
    let peers = match co_member_ids(&state.db_pool, user_id).await {
        Ok(peers) => peers,
        Err(e) => {
            tracing::warn!("[Presence] Failed to load peers of {}: {}", user_id, e);
            return;
        }
    };
    let delivered = state
        .hub
        .emit_to_users(&peers, &ServerEvent::Presence(payload))
        .await;
    tracing::debug!("[Presence] {} -> {} connection(s)", user_id, delivered);
}
