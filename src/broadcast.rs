//! Outbound fan-out to the players of one room.
//!
//! Each live socket owns an unbounded queue; its writer task is the only
//! thing that touches the socket, so messages for one player never
//! interleave. Sending is a non-blocking enqueue, which lets rooms deliver
//! while still holding their game lock and keep per-player order.

use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, PlayerId};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

/// Per-player outbound channel
#[derive(Debug, Clone)]
pub struct PlayerConn {
    pub id: ConnectionId,
    pub player_id: PlayerId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl PlayerConn {
    /// Create a connection handle and the receiving end its writer drains
    pub fn new(player_id: impl Into<PlayerId>) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: ulid::Ulid::new().to_string(),
            player_id: player_id.into(),
            tx,
        };
        (conn, rx)
    }

    /// Returns false if the socket side is gone
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// A message addressed to the whole room or to one player
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    All(ServerMessage),
    To(PlayerId, ServerMessage),
}

/// Current connection of every attached player. At most one per player.
#[derive(Debug, Default)]
pub struct Connections {
    conns: RwLock<HashMap<PlayerId, PlayerConn>>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection, replacing any previous one for the same player.
    /// Dropping the old handle closes its queue, which ends the old socket.
    pub async fn attach(&self, conn: PlayerConn) {
        let mut conns = self.conns.write().await;
        if let Some(old) = conns.insert(conn.player_id.clone(), conn) {
            tracing::debug!("Replaced connection {} of {}", old.id, old.player_id);
        }
    }

    /// Detach a player's connection, but only if it is still `conn_id`.
    /// A newer connection for the same player stays attached.
    pub async fn detach(&self, player_id: &str, conn_id: &str) -> bool {
        let mut conns = self.conns.write().await;
        match conns.get(player_id) {
            Some(current) if current.id == conn_id => {
                conns.remove(player_id);
                true
            }
            _ => false,
        }
    }

    pub async fn clear(&self) {
        self.conns.write().await.clear();
    }

    pub async fn count(&self) -> usize {
        self.conns.read().await.len()
    }

    pub async fn is_connected(&self, player_id: &str) -> bool {
        self.conns.read().await.contains_key(player_id)
    }

    /// Best-effort send to one player. Missing or closed connections are skipped.
    pub async fn send_to(&self, player_id: &str, msg: ServerMessage) -> bool {
        let conns = self.conns.read().await;
        match conns.get(player_id) {
            Some(conn) => conn.send(msg),
            None => false,
        }
    }

    /// Deliver a batch in order. Returns the number of messages enqueued.
    pub async fn deliver(&self, envelopes: Vec<Envelope>) -> usize {
        let conns = self.conns.read().await;
        let mut sent = 0;
        for envelope in envelopes {
            match envelope {
                Envelope::All(msg) => {
                    for conn in conns.values() {
                        if conn.send(msg.clone()) {
                            sent += 1;
                        }
                    }
                }
                Envelope::To(player_id, msg) => {
                    if let Some(conn) = conns.get(&player_id) {
                        if conn.send(msg) {
                            sent += 1;
                        }
                    }
                }
            }
        }
        sent
    }
}
