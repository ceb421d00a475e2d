//! Connection Registry
//!
//! Owns every live connection. A handle carries the identity authenticated
//! at handshake, the outbound mailbox and the set of rooms it has joined;
//! that set is what unregister walks to clean up the group table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use super::membership::Outbound;
use crate::backend::auth::Identity;
use crate::shared::{ChatId, ConnectionId, HubError, ServerFrame, UserId};

#[derive(Debug, Default)]
pub(crate) struct HandleState {
    pub rooms: HashSet<ChatId>,
    /// Set once unregister has started; joins after this point are refused
    pub closed: bool,
}

/// One registered connection
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: Identity,
    outbound: Outbound,
    state: Mutex<HandleState>,
}

impl ConnectionHandle {
    pub(crate) fn new(identity: Identity, outbound: Outbound) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            outbound,
            state: Mutex::new(HandleState::default()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Queue a frame for this connection only. Never waits for room.
    pub fn try_send(&self, frame: ServerFrame) -> Result<(), HubError> {
        self.outbound
            .try_send(frame)
            .map_err(|e| HubError::transport(format!("outbound mailbox rejected frame: {}", e)))
    }

    pub(crate) async fn lock_state(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().await
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: Arc<ConnectionHandle>) {
        self.connections.write().await.insert(handle.id(), handle);
    }

    pub async fn remove(&self, id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.write().await.remove(&id)
    }

    pub async fn get(&self, id: ConnectionId) -> Result<Arc<ConnectionHandle>, HubError> {
        self.connections
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| HubError::not_found("connection", id))
    }

    pub async fn ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Connections owned by one user across all of their devices
    pub async fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.connections
            .read()
            .await
            .values()
            .filter(|handle| handle.identity().user_id == user_id)
            .map(|handle| handle.id())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
