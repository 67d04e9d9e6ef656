use chat_protocol::ServerEvent;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

/// Unique identifier for one socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broadcast target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Private room of a user, joined automatically on authentication.
    User(Uuid),
    Conversation(Uuid),
}

struct Subscriber {
    id: ConnectionId,
    sender: UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Rooms {
    members: HashMap<Room, Vec<Subscriber>>,
    // reverse index for teardown
    joined: HashMap<ConnectionId, HashSet<Room>>,
}

/// Room membership tables for every live connection in this process.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Rooms>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Joining twice is a no-op.
    pub async fn join(&self, room: Room, id: ConnectionId, sender: UnboundedSender<ServerEvent>) {
        let mut guard = self.inner.write().await;
        if !guard.joined.entry(id).or_default().insert(room) {
            return;
        }
        let subscribers = guard.members.entry(room).or_default();
        subscribers.push(Subscriber { id, sender });

        tracing::debug!(
            connection_id = %id,
            ?room,
            members = subscribers.len(),
            "joined room"
        );
    }

    /// Drop a connection from every room it joined.
    pub async fn leave_all(&self, id: ConnectionId) {
        let mut guard = self.inner.write().await;
        let Some(rooms) = guard.joined.remove(&id) else {
            return;
        };

        for room in rooms {
            if let Some(subscribers) = guard.members.get_mut(&room) {
                subscribers.retain(|s| s.id != id);
                if subscribers.is_empty() {
                    guard.members.remove(&room);
                }
            }
        }
        tracing::debug!(connection_id = %id, "left all rooms");
    }

    /// Send an event to every member of a room. Returns how many connections
    /// received it; closed connections are pruned.
    pub async fn broadcast(&self, room: Room, event: &ServerEvent) -> usize {
        let mut guard = self.inner.write().await;
        let Some(subscribers) = guard.members.get_mut(&room) else {
            return 0;
        };

        let mut dead = Vec::new();
        subscribers.retain(|s| {
            let ok = s.sender.send(event.clone()).is_ok();
            if !ok {
                dead.push(s.id);
            }
            ok
        });
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            guard.members.remove(&room);
        }

        for id in dead {
            if let Some(rooms) = guard.joined.get_mut(&id) {
                rooms.remove(&room);
            }
            tracing::debug!(connection_id = %id, ?room, "pruned closed connection");
        }
        delivered
    }

    pub async fn member_count(&self, room: Room) -> usize {
        let guard = self.inner.read().await;
        guard.members.get(&room).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn is_member(&self, room: Room, id: ConnectionId) -> bool {
        let guard = self.inner.read().await;
        guard
            .joined
            .get(&id)
            .map(|rooms| rooms.contains(&room))
            .unwrap_or(false)
    }
}
