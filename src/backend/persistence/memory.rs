//! In-process collaborators
//!
//! Used when no database is configured and throughout the tests. The store
//! can be switched into an unavailable mode to exercise persistence failures.

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

use super::{ChatDirectory, MessageStore, NewMessage};
use crate::shared::message::TOMBSTONE;
use crate::shared::{ChatId, ChatMessage, HubError, MessageId, UserId};

#[derive(Debug, Default)]
struct StoreInner {
    last_id: MessageId,
    messages: BTreeMap<MessageId, ChatMessage>,
}

/// Message store backed by an ordered map
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    inner: Mutex<StoreInner>,
    unavailable: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with a persistence error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored rows, tombstones included
    pub async fn len(&self) -> usize {
        self.inner.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), HubError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(HubError::persistence("message store is unavailable"));
        }
        Ok(())
    }
}

impl MessageStore for InMemoryMessageStore {
    fn insert(&self, message: NewMessage) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            self.check_available()?;
            let mut inner = self.inner.lock().await;
            inner.last_id += 1;
            let stored = ChatMessage {
                id: inner.last_id,
                chat_id: message.chat_id,
                user_id: message.user_id,
                content: message.content,
                is_attachment: message.is_attachment,
                file_url: message.file_url,
                file_name: message.file_name,
                file_size: message.file_size,
                file_type: message.file_type,
                is_deleted: false,
                sent_at: Utc::now(),
                edited_at: None,
            };
            inner.messages.insert(stored.id, stored.clone());
            Ok(stored)
        }
        .boxed()
    }

    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<Option<ChatMessage>, HubError>> {
        async move { Ok(self.inner.lock().await.messages.get(&id).cloned()) }.boxed()
    }

    fn update_content(
        &self,
        id: MessageId,
        content: String,
    ) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            self.check_available()?;
            let mut inner = self.inner.lock().await;
            let message = inner
                .messages
                .get_mut(&id)
                .ok_or_else(|| HubError::not_found("message", id))?;
            message.content = content;
            message.edited_at = Some(Utc::now());
            Ok(message.clone())
        }
        .boxed()
    }

    fn tombstone(&self, id: MessageId) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            self.check_available()?;
            let mut inner = self.inner.lock().await;
            let message = inner
                .messages
                .get_mut(&id)
                .ok_or_else(|| HubError::not_found("message", id))?;
            message.content = TOMBSTONE.to_string();
            message.is_deleted = true;
            Ok(message.clone())
        }
        .boxed()
    }

    fn list_by_chat(&self, chat_id: ChatId) -> BoxFuture<'_, Result<Vec<ChatMessage>, HubError>> {
        async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .messages
                .values()
                .filter(|message| message.chat_id == chat_id)
                .cloned()
                .collect())
        }
        .boxed()
    }
}

/// Chat membership held in memory
#[derive(Debug, Default)]
pub struct InMemoryChatDirectory {
    members: RwLock<HashSet<(ChatId, UserId)>>,
}

impl InMemoryChatDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, chat_id: ChatId, user_id: UserId) {
        self.members.write().await.insert((chat_id, user_id));
    }

    pub async fn remove_member(&self, chat_id: ChatId, user_id: UserId) {
        self.members.write().await.remove(&(chat_id, user_id));
    }
}

impl ChatDirectory for InMemoryChatDirectory {
    fn is_member(&self, user_id: UserId, chat_id: ChatId) -> BoxFuture<'_, Result<bool, HubError>> {
        async move { Ok(self.members.read().await.contains(&(chat_id, user_id))) }.boxed()
    }
}
