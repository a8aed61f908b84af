//! Process-wide room collection and the age-based eviction sweep.

use super::room::Room;
use crate::config::RoomRules;
use crate::types::{PlayerId, RoomId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Rooms are keyed by their trimmed, lowercased name
pub fn room_key(name: &str) -> RoomId {
    name.trim().to_lowercase()
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
    rules: RoomRules,
    max_age: Duration,
}

impl RoomRegistry {
    pub fn new(rules: RoomRules, max_age: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            rules,
            max_age,
        }
    }

    pub async fn find(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(&room_key(name)).cloned()
    }

    /// Look a room up by name, creating it with `owner_id` if it doesn't
    /// exist. Returns true when the room was created.
    pub async fn find_or_create(&self, name: &str, owner_id: &str) -> (Arc<Room>, bool) {
        let key = room_key(name);
        if let Some(room) = self.rooms.read().await.get(&key) {
            return (room.clone(), false);
        }

        let mut rooms = self.rooms.write().await;
        // Someone may have created it between the two locks
        if let Some(room) = rooms.get(&key) {
            return (room.clone(), false);
        }
        let room = Arc::new(Room::new(key.clone(), owner_id, self.rules.clone()));
        rooms.insert(key.clone(), room.clone());
        tracing::info!("Created room {} owned by {}", key, owner_id);
        (room, true)
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.write().await.remove(&room_key(name))
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    pub async fn owner_of(&self, name: &str) -> Option<PlayerId> {
        self.find(name).await.map(|room| room.owner_id.clone())
    }

    /// Evict every room older than the configured lifetime, whatever state
    /// its game is in. Connections of evicted rooms are dropped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Arc<Room>> = {
            let mut rooms = self.rooms.write().await;
            let keys: Vec<RoomId> = rooms
                .iter()
                .filter(|(_, room)| {
                    (now - room.created_at)
                        .to_std()
                        .is_ok_and(|age| age >= self.max_age)
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| rooms.remove(key)).collect()
        };

        for room in &expired {
            tracing::info!("Evicting room {} created at {}", room.id, room.created_at);
            room.disconnect_all().await;
        }
        expired.len()
    }

    /// Start the periodic sweep. It runs until the returned handle is shut down.
    /// A zero interval is raised to one millisecond.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> RoomSweeper {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let cancel = CancellationToken::new();
        let registry = Arc::clone(self);
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.sweep(Utc::now()).await;
                        if evicted > 0 {
                            tracing::info!("Sweep evicted {} rooms, {} left", evicted, registry.len().await);
                        }
                    }
                }
            }
            tracing::debug!("Room sweeper stopped");
        });

        RoomSweeper { cancel, handle }
    }
}

pub struct RoomSweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RoomSweeper {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Room sweeper failed: {}", e);
        }
    }
}
