//! Message Ingest & Persistence Gateway
//!
//! Every change to a chat's messages goes through here: validate, check
//! authorization with the collaborators, persist, then hand the stored row
//! to the dispatcher. Storage failures abort before anything is dispatched.

use std::sync::Arc;

use super::dispatcher::{DispatchReport, Dispatcher};
use super::sequencer::ChatSequencer;
use crate::backend::auth::Identity;
use crate::backend::persistence::{ChatDirectory, MessageStore, NewMessage};
use crate::shared::message::validate_content;
use crate::shared::{
    AddMessageDto, ChatId, ChatMessage, HubError, MessageEvent, MessageId, UpdateMessageDto,
};

/// A persisted event and how its fan-out went
#[derive(Debug, Clone)]
pub struct Accepted {
    pub event: MessageEvent,
    pub report: DispatchReport,
}

pub struct Gateway {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn ChatDirectory>,
    sequencer: ChatSequencer,
    dispatcher: Dispatcher,
    max_message_length: usize,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn ChatDirectory>,
        dispatcher: Dispatcher,
        max_message_length: usize,
    ) -> Self {
        Self {
            store,
            directory,
            sequencer: ChatSequencer::new(),
            dispatcher,
            max_message_length,
        }
    }

    pub async fn submit(&self, sender: &Identity, dto: AddMessageDto) -> Result<Accepted, HubError> {
        validate_content(&dto.content, self.max_message_length)?;
        if dto.user_id != sender.user_id {
            tracing::warn!(
                "[Gateway] User {} tried to send as user {}",
                sender.user_id,
                dto.user_id
            );
            return Err(HubError::authorization(
                "Sender does not match the authenticated user",
            ));
        }
        self.require_membership(sender, dto.chat_id).await?;

        let chat_id = dto.chat_id;
        let _sequence = self.sequencer.acquire(chat_id).await;
        let stored = self.store.insert(NewMessage::from(dto)).await.map_err(|e| {
            tracing::error!("[Gateway] Failed to store message in chat {}: {}", chat_id, e);
            e
        })?;

        tracing::info!(
            "[Gateway] Message {} stored in chat {} by user {}",
            stored.id,
            chat_id,
            sender.user_id
        );
        Ok(self.publish(MessageEvent::created(stored)).await)
    }

    pub async fn edit(&self, editor: &Identity, dto: UpdateMessageDto) -> Result<Accepted, HubError> {
        validate_content(&dto.content, self.max_message_length)?;
        let chat_id = self.chat_of(dto.id).await?;

        let _sequence = self.sequencer.acquire(chat_id).await;
        self.owned_live_message(editor, dto.id).await?;
        let updated = self
            .store
            .update_content(dto.id, dto.content)
            .await
            .map_err(|e| {
                tracing::error!("[Gateway] Failed to edit message {}: {}", dto.id, e);
                e
            })?;

        tracing::info!("[Gateway] Message {} edited by user {}", updated.id, editor.user_id);
        Ok(self.publish(MessageEvent::edited(updated)).await)
    }

    pub async fn delete(&self, editor: &Identity, message_id: MessageId) -> Result<Accepted, HubError> {
        let chat_id = self.chat_of(message_id).await?;

        let _sequence = self.sequencer.acquire(chat_id).await;
        self.owned_live_message(editor, message_id).await?;
        let tombstoned = self.store.tombstone(message_id).await.map_err(|e| {
            tracing::error!("[Gateway] Failed to delete message {}: {}", message_id, e);
            e
        })?;

        tracing::info!("[Gateway] Message {} deleted by user {}", message_id, editor.user_id);
        Ok(self.publish(MessageEvent::deleted(tombstoned)).await)
    }

    /// Stored messages of a chat, tombstones included, oldest first
    pub async fn history(&self, requester: &Identity, chat_id: ChatId) -> Result<Vec<ChatMessage>, HubError> {
        self.require_membership(requester, chat_id).await?;
        self.store.list_by_chat(chat_id).await
    }

    async fn publish(&self, event: MessageEvent) -> Accepted {
        let report = self.dispatcher.dispatch(&event).await;
        Accepted { event, report }
    }

    async fn require_membership(&self, identity: &Identity, chat_id: ChatId) -> Result<(), HubError> {
        if self.directory.is_member(identity.user_id, chat_id).await? {
            Ok(())
        } else {
            tracing::warn!(
                "[Gateway] User {} is not a member of chat {}",
                identity.user_id,
                chat_id
            );
            Err(HubError::authorization(format!(
                "User {} is not a member of chat {}",
                identity.user_id, chat_id
            )))
        }
    }

    async fn chat_of(&self, message_id: MessageId) -> Result<ChatId, HubError> {
        self.store
            .get(message_id)
            .await?
            .map(|message| message.chat_id)
            .ok_or_else(|| HubError::not_found("message", message_id))
    }

    /// Re-read under the chat lock: tombstones are gone, and only the sender
    /// may change a message.
    async fn owned_live_message(&self, editor: &Identity, message_id: MessageId) -> Result<ChatMessage, HubError> {
        let message = self
            .store
            .get(message_id)
            .await?
            .filter(|message| !message.is_deleted)
            .ok_or_else(|| HubError::not_found("message", message_id))?;

        if message.user_id != editor.user_id {
            tracing::warn!(
                "[Gateway] User {} may not change message {} owned by user {}",
                editor.user_id,
                message_id,
                message.user_id
            );
            return Err(HubError::authorization(
                "Only the sender can change this message",
            ));
        }
        Ok(message)
    }
}
