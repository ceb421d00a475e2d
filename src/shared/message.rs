//! Chat Message Data Structures
//!
//! Message records as stored by the persistence collaborator, the events the
//! hub dispatches for them, and the DTOs clients submit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::HubError;

/// Chat identifier; a chat's realtime room uses the same id
pub type ChatId = i64;

/// Message identifier assigned by the persistence gateway
pub type MessageId = i64;

/// User identifier from the REST collaborator
pub type UserId = i64;

/// Content stored in place of a deleted message
pub const TOMBSTONE: &str = "This message was deleted";

/// A stored chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// Sender of the message
    pub user_id: UserId,
    pub content: String,
    #[serde(default)]
    pub is_attachment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// What happened to a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Edited,
    Deleted,
}

/// Immutable record handed from the gateway to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub kind: EventKind,
    pub message: ChatMessage,
}

impl MessageEvent {
    pub fn created(message: ChatMessage) -> Self {
        Self {
            kind: EventKind::Created,
            message,
        }
    }

    pub fn edited(message: ChatMessage) -> Self {
        Self {
            kind: EventKind::Edited,
            message,
        }
    }

    pub fn deleted(message: ChatMessage) -> Self {
        Self {
            kind: EventKind::Deleted,
            message,
        }
    }

    /// Room the event is dispatched to
    pub fn chat_id(&self) -> ChatId {
        self.message.chat_id
    }

    pub fn message_id(&self) -> MessageId {
        self.message.id
    }
}

/// Body of a `SendMessage` invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageDto {
    pub content: String,
    /// Sender claimed by the client; must match the authenticated identity
    pub user_id: UserId,
    pub chat_id: ChatId,
    #[serde(default)]
    pub is_attachment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

impl AddMessageDto {
    /// Plain text message without attachment metadata
    pub fn text(chat_id: ChatId, user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            user_id,
            chat_id,
            is_attachment: false,
            file_url: None,
            file_name: None,
            file_size: None,
            file_type: None,
        }
    }
}

/// Body of an `EditMessage` invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageDto {
    pub id: MessageId,
    pub content: String,
}

/// Parse a wire room id into a chat id
pub fn parse_room_id(room_id: &str) -> Result<ChatId, HubError> {
    room_id
        .trim()
        .parse::<ChatId>()
        .map_err(|_| HubError::validation("roomId", format!("'{}' is not a chat id", room_id)))
}

/// Check message content against the configured maximum length.
///
/// Trimming only applies to the emptiness check; stored content keeps its
/// surrounding whitespace.
pub fn validate_content(content: &str, max_length: usize) -> Result<(), HubError> {
    if content.trim().is_empty() {
        return Err(HubError::validation(
            "content",
            "Message content cannot be empty",
        ));
    }
    let length = content.chars().count();
    if length > max_length {
        return Err(HubError::validation(
            "content",
            format!("Message is {} characters, the limit is {}", length, max_length),
        ));
    }
    Ok(())
}
