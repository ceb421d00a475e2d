//! Realtime Messaging Hub
//!
//! The hub is the process-wide owner of connection and room state. It is
//! built once at startup, shared as `Arc<Hub>` and torn down by
//! [`Hub::shutdown`]; nothing here is a global.
//!
//! # Architecture
//!
//! - **`registry`** - Connection Registry: live connections and identities
//! - **`membership`** - Group Membership Table: chat id to joined connections
//! - **`sequencer`** - Per-chat lock ordering persist + dispatch
//! - **`dispatcher`** - Broadcast Dispatcher: fan-out into member mailboxes
//! - **`gateway`** - Message Ingest & Persistence Gateway
//!
//! # Module Structure
//!
//! ```text
//! hub/
//! ├── mod.rs          - Hub facade, invocation routing, stats
//! ├── registry.rs     - ConnectionRegistry, ConnectionHandle
//! ├── membership.rs   - GroupTable
//! ├── sequencer.rs    - ChatSequencer
//! ├── dispatcher.rs   - Dispatcher, DispatchReport
//! └── gateway.rs      - Gateway
//! ```
//!
//! # Lifecycle
//!
//! 1. `register` authenticates a token and creates a connection handle
//! 2. `join` / `leave` maintain room membership for that connection
//! 3. `send_message` / `edit_message` / `delete_message` go through the
//!    gateway and reach every joined connection's mailbox
//! 4. `unregister` removes the connection from every room before returning

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::backend::auth::{Authenticator, Identity};
use crate::backend::persistence::{ChatDirectory, MessageStore};
use crate::shared::message::parse_room_id;
use crate::shared::{
    AddMessageDto, ChatId, ChatMessage, ConnectionId, HubCall, HubConfig, HubError, MessageId,
    ServerFrame, UpdateMessageDto,
};

pub mod dispatcher;
pub mod gateway;
pub mod membership;
pub mod registry;
pub mod sequencer;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use gateway::{Accepted, Gateway};
pub use membership::{GroupTable, Outbound};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use sequencer::ChatSequencer;

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub rooms: usize,
}

pub struct Hub {
    config: HubConfig,
    authenticator: Arc<dyn Authenticator>,
    registry: ConnectionRegistry,
    groups: Arc<GroupTable>,
    gateway: Gateway,
    shutdown: watch::Sender<bool>,
}

impl Hub {
    pub fn new(
        config: HubConfig,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn ChatDirectory>,
    ) -> Self {
        let groups = Arc::new(GroupTable::new());
        let gateway = Gateway::new(
            store,
            directory,
            Dispatcher::new(groups.clone()),
            config.max_message_length,
        );
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            authenticator,
            registry: ConnectionRegistry::new(),
            groups,
            gateway,
            shutdown,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    // Connection Registry

    /// Authenticate `token` and register a connection writing to `outbound`
    pub async fn register(&self, token: &str, outbound: Outbound) -> Result<ConnectionId, HubError> {
        if self.is_shutting_down() {
            return Err(HubError::transport("hub is shutting down"));
        }
        let identity = self.authenticator.authenticate(token)?;
        if identity.is_expired(Utc::now()) {
            return Err(HubError::authentication("token has expired"));
        }

        let handle = Arc::new(ConnectionHandle::new(identity, outbound));
        let id = handle.id();
        let user_id = handle.identity().user_id;
        self.registry.insert(handle).await;
        tracing::info!("[Hub] Connection {} registered for user {}", id, user_id);
        Ok(id)
    }

    /// Remove a connection and every room membership it holds.
    ///
    /// Returns `false` when the connection was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let Some(handle) = self.registry.remove(id).await else {
            return false;
        };

        let rooms = {
            let mut state = handle.lock_state().await;
            state.closed = true;
            std::mem::take(&mut state.rooms)
        };
        for chat_id in &rooms {
            self.groups.remove(*chat_id, id).await;
        }

        tracing::info!(
            "[Hub] Connection {} unregistered, left {} room(s)",
            id,
            rooms.len()
        );
        true
    }

    pub async fn lookup(&self, id: ConnectionId) -> Result<Identity, HubError> {
        Ok(self.registry.get(id).await?.identity().clone())
    }

    // Group Membership Table

    /// Join a chat's realtime group. Returns `false` when already joined.
    pub async fn join(&self, id: ConnectionId, chat_id: ChatId) -> Result<bool, HubError> {
        let handle = self.registry.get(id).await?;
        let mut state = handle.lock_state().await;
        if state.closed {
            return Err(HubError::not_found("connection", id));
        }
        let added = self
            .groups
            .add(chat_id, id, handle.outbound().clone())
            .await;
        state.rooms.insert(chat_id);

        if added {
            tracing::debug!("[Hub] Connection {} joined room {}", id, chat_id);
        }
        Ok(added)
    }

    /// Leave a chat's realtime group. Returns `false` when not joined.
    pub async fn leave(&self, id: ConnectionId, chat_id: ChatId) -> Result<bool, HubError> {
        let handle = self.registry.get(id).await?;
        let mut state = handle.lock_state().await;
        if !state.rooms.remove(&chat_id) {
            return Ok(false);
        }
        self.groups.remove(chat_id, id).await;
        tracing::debug!("[Hub] Connection {} left room {}", id, chat_id);
        Ok(true)
    }

    pub async fn members_of(&self, chat_id: ChatId) -> Vec<ConnectionId> {
        self.groups.members(chat_id).await
    }

    // Gateway

    pub async fn send_message(&self, id: ConnectionId, dto: AddMessageDto) -> Result<ChatMessage, HubError> {
        let identity = self.active_identity(id).await?;
        Ok(self.gateway.submit(&identity, dto).await?.event.message)
    }

    pub async fn edit_message(&self, id: ConnectionId, dto: UpdateMessageDto) -> Result<ChatMessage, HubError> {
        let identity = self.active_identity(id).await?;
        Ok(self.gateway.edit(&identity, dto).await?.event.message)
    }

    pub async fn delete_message(&self, id: ConnectionId, message_id: MessageId) -> Result<ChatMessage, HubError> {
        let identity = self.active_identity(id).await?;
        Ok(self.gateway.delete(&identity, message_id).await?.event.message)
    }

    pub async fn history(&self, id: ConnectionId, chat_id: ChatId) -> Result<Vec<ChatMessage>, HubError> {
        let identity = self.active_identity(id).await?;
        self.gateway.history(&identity, chat_id).await
    }

    /// History for a caller authenticated outside a hub connection
    pub async fn history_for(&self, identity: &Identity, chat_id: ChatId) -> Result<Vec<ChatMessage>, HubError> {
        self.gateway.history(identity, chat_id).await
    }

    /// Route one client invocation.
    ///
    /// `SendMessage` answers with the stored message id; the other calls
    /// complete without a result.
    pub async fn invoke(&self, id: ConnectionId, call: HubCall) -> Result<Option<serde_json::Value>, HubError> {
        tracing::debug!("[Hub] Connection {} invoked {}", id, call.name());
        match call {
            HubCall::AddToGroup(room_id) => {
                self.active_identity(id).await?;
                self.join(id, parse_room_id(&room_id)?).await?;
                Ok(None)
            }
            HubCall::RemoveFromGroup(room_id) => {
                self.active_identity(id).await?;
                self.leave(id, parse_room_id(&room_id)?).await?;
                Ok(None)
            }
            HubCall::SendMessage(dto) => {
                let stored = self.send_message(id, dto).await?;
                Ok(Some(serde_json::Value::from(stored.id)))
            }
            HubCall::EditMessage(dto) => {
                self.edit_message(id, dto).await?;
                Ok(None)
            }
            HubCall::DeleteMessage(message_id) => {
                self.delete_message(id, message_id).await?;
                Ok(None)
            }
        }
    }

    /// Identity of a registered connection whose credential is still valid
    async fn active_identity(&self, id: ConnectionId) -> Result<Identity, HubError> {
        let identity = self.lookup(id).await?;
        if identity.is_expired(Utc::now()) {
            tracing::warn!("[Hub] Credential of connection {} has expired", id);
            return Err(HubError::authentication("token has expired"));
        }
        Ok(identity)
    }

    // Lifecycle

    /// Send a close frame to one connection and unregister it
    pub async fn disconnect(&self, id: ConnectionId, reason: &str) -> bool {
        if let Ok(handle) = self.registry.get(id).await {
            if let Err(e) = handle.try_send(ServerFrame::close(reason)) {
                tracing::debug!("[Hub] Close frame for {} not queued: {}", id, e);
            }
        }
        self.unregister(id).await
    }

    /// Close every connection and refuse new ones
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let ids = self.registry.ids().await;
        tracing::info!("[Hub] Shutting down, closing {} connection(s)", ids.len());
        for id in ids {
            self.disconnect(id, "server shutting down").await;
        }
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.len().await,
            rooms: self.groups.room_count().await,
        }
    }
}
