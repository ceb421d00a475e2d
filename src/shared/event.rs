/**
 * Hub Event System
 *
 * Server-to-client events pushed to every connection joined to a room.
 * The event names match the hub contract clients subscribe to:
 * `ReceiveMessage`, `OnMessageEdited` and `OnMessageDeleted`.
 */
use serde::{Deserialize, Serialize};

use crate::shared::message::{ChatId, ChatMessage, EventKind, MessageEvent, MessageId};

/// Event delivered to room members
///
/// Serialized as `{"target": "...", "arguments": ...}`. Tuple variants carry
/// their positional arguments as a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "target", content = "arguments")]
pub enum HubEvent {
    /// A new message was stored in the room
    ReceiveMessage(ChatMessage),
    /// `(messageId, newContent)`
    OnMessageEdited(MessageId, String),
    /// `(chatId, messageId)`
    OnMessageDeleted(ChatId, MessageId),
}

impl HubEvent {
    /// Name of the event as seen by clients
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReceiveMessage(_) => "ReceiveMessage",
            Self::OnMessageEdited(..) => "OnMessageEdited",
            Self::OnMessageDeleted(..) => "OnMessageDeleted",
        }
    }

    /// Room the event belongs to, when the payload names it
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Self::ReceiveMessage(message) => Some(message.chat_id),
            Self::OnMessageEdited(..) => None,
            Self::OnMessageDeleted(chat_id, _) => Some(*chat_id),
        }
    }
}

impl From<&MessageEvent> for HubEvent {
    fn from(event: &MessageEvent) -> Self {
        match event.kind {
            EventKind::Created => Self::ReceiveMessage(event.message.clone()),
            EventKind::Edited => {
                Self::OnMessageEdited(event.message.id, event.message.content.clone())
            }
            EventKind::Deleted => Self::OnMessageDeleted(event.message.chat_id, event.message.id),
        }
    }
}
