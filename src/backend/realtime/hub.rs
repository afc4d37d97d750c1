/**
 * Connection Hub
 *
 * Registry of live gateway connections. Each connection owns an unbounded
 * queue drained by its socket writer task; the hub only ever pushes into
 * those queues, so emitting never waits on a slow socket.
 *
 * Three indexes are kept in step under one `RwLock`:
 *
 * - connection id → client
 * - user id → connection ids
 * - room id → connection ids subscribed with `room:join`
 *
 * Every emit serializes the event once and clones the text per recipient.
 * A queue whose receiver is gone is skipped.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::shared::event::{RoomRef, ServerEvent};

/// Frame queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Close the socket with a code and reason
    Close(u16, String),
}

/// A registered gateway connection
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    /// Channel for sending frames to this client's write loop
    pub sender: mpsc::UnboundedSender<Outbound>,
    pub connected_at: Instant,
    rooms: HashSet<Uuid>,
}

impl ConnectedClient {
    pub fn new(
        conn_id: Uuid,
        user_id: Uuid,
        username: impl Into<String>,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            conn_id,
            user_id,
            username: username.into(),
            sender,
            connected_at: Instant::now(),
            rooms: HashSet::new(),
        }
    }

    /// Queue a serialized frame; false when the writer has gone away
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(Outbound::Text(frame.to_string())).is_ok()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Uuid> {
        self.rooms.iter()
    }
}

/// What `unregister` removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregistered {
    pub user_id: Uuid,
    pub username: String,
    pub rooms: Vec<Uuid>,
    /// True when this was the user's last open connection
    pub last_connection: bool,
}

#[derive(Debug, Default)]
struct HubInner {
    clients: HashMap<Uuid, ConnectedClient>,
    by_user: HashMap<Uuid, HashSet<Uuid>>,
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

impl HubInner {
    fn remove_from_room(&mut self, room_id: Uuid, conn_id: Uuid) -> bool {
        let removed = match self.rooms.get_mut(&room_id) {
            Some(members) => {
                let removed = members.remove(&conn_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
                removed
            }
            None => false,
        };
        if let Some(client) = self.clients.get_mut(&conn_id) {
            client.rooms.remove(&room_id);
        }
        removed
    }
}

/// Shared handle to the connection registry
#[derive(Debug, Clone, Default)]
pub struct RealtimeHub {
    inner: Arc<RwLock<HubInner>>,
}

fn serialize(event: &ServerEvent) -> Option<String> {
    match event.to_text() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("[Hub] Failed to serialize {}: {}", event.name(), e);
            None
        }
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection; returns true if it is the user's first
    pub async fn register(&self, client: ConnectedClient) -> bool {
        let mut inner = self.inner.write().await;
        let conns = inner.by_user.entry(client.user_id).or_default();
        let first = conns.is_empty();
        conns.insert(client.conn_id);
        tracing::debug!(
            conn_id = %client.conn_id,
            user_id = %client.user_id,
            "[Hub] Registered connection"
        );
        inner.clients.insert(client.conn_id, client);
        first
    }

    /// Remove a connection and all of its room subscriptions
    pub async fn unregister(&self, conn_id: Uuid) -> Option<Unregistered> {
        let mut inner = self.inner.write().await;
        let client = inner.clients.remove(&conn_id)?;

        for room_id in &client.rooms {
            if let Some(members) = inner.rooms.get_mut(room_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    inner.rooms.remove(room_id);
                }
            }
        }

        let last_connection = match inner.by_user.get_mut(&client.user_id) {
            Some(conns) => {
                conns.remove(&conn_id);
                conns.is_empty()
            }
            None => true,
        };
        if last_connection {
            inner.by_user.remove(&client.user_id);
        }

        tracing::debug!(conn_id = %conn_id, user_id = %client.user_id, "[Hub] Unregistered connection");
        Some(Unregistered {
            user_id: client.user_id,
            username: client.username,
            rooms: client.rooms.into_iter().collect(),
            last_connection,
        })
    }

    /// Subscribe a connection to a room; returns false if already subscribed
    pub async fn join_room(&self, conn_id: Uuid, room_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let Some(client) = inner.clients.get_mut(&conn_id) else {
            return false;
        };
        let added = client.rooms.insert(room_id);
        inner.rooms.entry(room_id).or_default().insert(conn_id);
        added
    }

    pub async fn leave_room(&self, conn_id: Uuid, room_id: Uuid) -> bool {
        self.inner.write().await.remove_from_room(room_id, conn_id)
    }

    pub async fn is_in_room(&self, conn_id: Uuid, room_id: Uuid) -> bool {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(&room_id)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// True if any of the user's connections is subscribed to the room
    pub async fn is_viewing(&self, user_id: Uuid, room_id: Uuid) -> bool {
        let inner = self.inner.read().await;
        let (Some(conns), Some(members)) = (inner.by_user.get(&user_id), inner.rooms.get(&room_id)) else {
            return false;
        };
        conns.iter().any(|conn_id| members.contains(conn_id))
    }

    /// Send to every connection subscribed to `room_id`, optionally skipping one user
    pub async fn emit_to_room(&self, room_id: Uuid, event: &ServerEvent, except_user: Option<Uuid>) -> usize {
        let Some(text) = serialize(event) else {
            return 0;
        };
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&room_id) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|conn_id| inner.clients.get(conn_id))
            .filter(|client| Some(client.user_id) != except_user)
            .filter(|client| client.send(&text))
            .count()
    }

    /// Send to every connection of a user
    pub async fn emit_to_user(&self, user_id: Uuid, event: &ServerEvent) -> usize {
        let Some(text) = serialize(event) else {
            return 0;
        };
        let inner = self.inner.read().await;
        let Some(conns) = inner.by_user.get(&user_id) else {
            return 0;
        };
        conns
            .iter()
            .filter_map(|conn_id| inner.clients.get(conn_id))
            .filter(|client| client.send(&text))
            .count()
    }

    /// Send to several users at once; returns deliveries
    pub async fn emit_to_users(&self, user_ids: &[Uuid], event: &ServerEvent) -> usize {
        let Some(text) = serialize(event) else {
            return 0;
        };
        let inner = self.inner.read().await;
        user_ids
            .iter()
            .filter_map(|user_id| inner.by_user.get(user_id))
            .flatten()
            .filter_map(|conn_id| inner.clients.get(conn_id))
            .filter(|client| client.send(&text))
            .count()
    }

    pub async fn emit_to_connection(&self, conn_id: Uuid, event: &ServerEvent) -> bool {
        let Some(text) = serialize(event) else {
            return false;
        };
        let inner = self.inner.read().await;
        inner
            .clients
            .get(&conn_id)
            .is_some_and(|client| client.send(&text))
    }

    /// Queue a close frame for a connection
    pub async fn close_connection(&self, conn_id: Uuid, code: u16, reason: &str) -> bool {
        let inner = self.inner.read().await;
        inner.clients.get(&conn_id).is_some_and(|client| {
            client
                .sender
                .send(Outbound::Close(code, reason.to_string()))
                .is_ok()
        })
    }

    /// Unsubscribe all of a user's connections from a room and tell them
    pub async fn evict_user_from_room(&self, user_id: Uuid, room_id: Uuid) -> usize {
        let text = serialize(&ServerEvent::RoomRemoved(RoomRef { room_id }));
        let mut inner = self.inner.write().await;
        let conns: Vec<Uuid> = inner
            .by_user
            .get(&user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default();

        let mut evicted = 0;
        for conn_id in conns {
            if inner.remove_from_room(room_id, conn_id) {
                evicted += 1;
            }
            if let (Some(client), Some(text)) = (inner.clients.get(&conn_id), text.as_deref()) {
                client.send(text);
            }
        }
        evicted
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    pub async fn user_connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .map_or(0, HashSet::len)
    }

    pub async fn room_subscriber_count(&self, room_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&room_id)
            .map_or(0, HashSet::len)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.user_connection_count(user_id).await > 0
    }
}
