//! Group Membership Table
//!
//! Maps a chat id to the connections currently joined to its realtime group.
//! Each room has its own lock so work on one room never waits on another;
//! the outer map is only write-locked to create or prune a room.

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

use crate::shared::{ChatId, ConnectionId, ServerFrame};

/// Bounded mailbox feeding one connection's writer
pub type Outbound = mpsc::Sender<ServerFrame>;

type Room = RwLock<HashMap<ConnectionId, Outbound>>;

#[derive(Debug, Default)]
pub struct GroupTable {
    rooms: RwLock<HashMap<ChatId, Room>>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns `false` when it was already there.
    pub async fn add(&self, chat_id: ChatId, connection_id: ConnectionId, outbound: Outbound) -> bool {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(&chat_id) {
                return room.write().await.insert(connection_id, outbound).is_none();
            }
        }

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(chat_id).or_default();
        room.get_mut().insert(connection_id, outbound).is_none()
    }

    /// Remove a connection from a room. Returns `false` when it was not there.
    pub async fn remove(&self, chat_id: ChatId, connection_id: ConnectionId) -> bool {
        let now_empty = {
            let rooms = self.rooms.read().await;
            let Some(room) = rooms.get(&chat_id) else {
                return false;
            };
            let mut members = room.write().await;
            if members.remove(&connection_id).is_none() {
                return false;
            }
            members.is_empty()
        };

        if now_empty {
            let mut rooms = self.rooms.write().await;
            // A join may have slipped in between the two locks
            if rooms.get_mut(&chat_id).is_some_and(|room| room.get_mut().is_empty()) {
                rooms.remove(&chat_id);
                tracing::debug!("[Hub] Room {} pruned", chat_id);
            }
        }
        true
    }

    /// Snapshot of the connections joined to a room
    pub async fn members(&self, chat_id: ChatId) -> Vec<ConnectionId> {
        let rooms = self.rooms.read().await;
        match rooms.get(&chat_id) {
            Some(room) => room.read().await.keys().copied().collect(),
            None => Vec::new(),
        }
    }

    pub async fn contains(&self, chat_id: ChatId, connection_id: ConnectionId) -> bool {
        let rooms = self.rooms.read().await;
        match rooms.get(&chat_id) {
            Some(room) => room.read().await.contains_key(&connection_id),
            None => false,
        }
    }

    /// Run `deliver` for every member of a room while its membership is held
    /// stable. Joins and leaves on the same room wait until it returns, so
    /// `deliver` must not block.
    pub async fn for_each_member<F>(&self, chat_id: ChatId, mut deliver: F)
    where
        F: FnMut(ConnectionId, &Outbound),
    {
        let rooms = self.rooms.read().await;
        if let Some(room) = rooms.get(&chat_id) {
            for (connection_id, outbound) in room.read().await.iter() {
                deliver(*connection_id, outbound);
            }
        }
    }

    /// Number of rooms with at least one member
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
