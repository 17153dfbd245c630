use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use arena_types::events::GatewayEvent;
use arena_types::models::PresenceEntry;

/// Manages all connected clients and broadcasts events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for room-scoped gateway events. Every connection
    /// subscribes and filters against its own room set.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Lobby membership: connection id -> (player id, name). Presence is
    /// derived from this map and de-duplicated by player id.
    lobby_members: RwLock<HashMap<Uuid, (Uuid, String)>>,

    /// Per-player targeted send channels: player id -> (conn_id, sender)
    player_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                lobby_members: RwLock::new(HashMap::new()),
                player_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast a room-scoped event. Send order is delivery order for
    /// every subscriber.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-player targeted channel. Returns (conn_id, receiver).
    pub async fn register_player_channel(
        &self,
        player_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .player_channels
            .write()
            .await
            .insert(player_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Send a targeted event to a specific player.
    pub async fn send_to_player(&self, player_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.player_channels.read().await;
        if let Some((_, tx)) = channels.get(&player_id) {
            let _ = tx.send(event);
        }
    }

    /// Record lobby membership for a connection.
    pub async fn join_lobby(&self, conn_id: Uuid, player_id: Uuid, name: String) {
        self.inner
            .lobby_members
            .write()
            .await
            .insert(conn_id, (player_id, name));
    }

    pub async fn leave_lobby(&self, conn_id: Uuid) {
        self.inner.lobby_members.write().await.remove(&conn_id);
    }

    /// Connected lobby members, de-duplicated by player identity.
    pub async fn presence(&self) -> Vec<PresenceEntry> {
        let members = self.inner.lobby_members.read().await;
        let mut seen: HashMap<Uuid, String> = HashMap::new();
        for (player_id, name) in members.values() {
            seen.entry(*player_id).or_insert_with(|| name.clone());
        }
        seen.into_iter()
            .map(|(player_id, name)| PresenceEntry { player_id, name })
            .collect()
    }

    /// Tear down a connection's dispatcher state. Only cleans up the
    /// player channel if conn_id still owns it (a newer connection may
    /// have taken over).
    pub async fn disconnect(&self, player_id: Uuid, conn_id: Uuid) {
        self.leave_lobby(conn_id).await;

        let mut channels = self.inner.player_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&player_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&player_id);
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
