use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::warn;
use uuid::Uuid;

/// Handle to one live connection: an id plus the sending side of the
/// channel its writer task drains. Sending never blocks; a closed channel
/// means the peer is gone.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnHandle {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            tx,
        }
    }

    pub fn send(&self, event: String) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// In-memory room → connections map. Purely a fan-out structure: no
/// persistence happens behind this lock, and membership rows in the
/// database stay authoritative.
#[derive(Debug, Clone)]
pub struct Registry {
    rooms: Arc<Mutex<HashMap<Uuid, Vec<ConnHandle>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribes a connection to a room. Registering twice is a no-op.
    pub async fn register(&self, room_id: Uuid, conn: &ConnHandle) {
        let mut rooms = self.rooms.lock().await;
        let conns = rooms.entry(room_id).or_default();
        if !conns.iter().any(|c| c.id == conn.id) {
            conns.push(conn.clone());
        }
    }

    /// Unsubscribes a connection from a room. Absent entries are a no-op;
    /// an emptied room drops out of the map.
    pub async fn unregister(&self, room_id: Uuid, conn_id: Uuid) {
        let mut rooms = self.rooms.lock().await;
        if let Some(conns) = rooms.get_mut(&room_id) {
            conns.retain(|c| c.id != conn_id);
            if conns.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Delivers `event` to every connection registered to the room, in
    /// registration order. A dead peer is logged and skipped. Returns how
    /// many connections accepted the event.
    pub async fn broadcast(&self, room_id: Uuid, event: &str) -> usize {
        let rooms = self.rooms.lock().await;
        let Some(conns) = rooms.get(&room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for conn in conns {
            if conn.send(event.to_owned()) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, room_id = %room_id, "dropping broadcast to closed connection");
            }
        }
        delivered
    }

    /// Removes the connection from every room it is registered to. Safe to
    /// call more than once.
    pub async fn purge(&self, conn_id: Uuid) {
        let mut rooms = self.rooms.lock().await;
        rooms.retain(|_, conns| {
            conns.retain(|c| c.id != conn_id);
            !conns.is_empty()
        });
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }

    pub async fn connections_in(&self, room_id: Uuid) -> usize {
        self.rooms
            .lock()
            .await
            .get(&room_id)
            .map_or(0, Vec::len)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
