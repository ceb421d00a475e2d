//! Persistence Collaborators
//!
//! The hub does not own chat data. Messages are stored by a [`MessageStore`]
//! and chat membership is answered by a [`ChatDirectory`]; both stand in for
//! the REST persistence layer and are called synchronously before a submit is
//! confirmed.
//!
//! # Module Structure
//!
//! ```text
//! persistence/
//! ├── mod.rs     - Collaborator traits, NewMessage
//! ├── memory.rs  - In-process implementations (development, tests)
//! ├── sqlite.rs  - sqlx/SQLite implementation of both traits
//! └── http.rs    - REST chat-membership lookup via reqwest
//! ```
//!
//! Implementations return boxed futures so the hub can hold them as trait
//! objects.

use futures_util::future::BoxFuture;

use crate::shared::{AddMessageDto, ChatId, ChatMessage, HubError, MessageId, UserId};

/// In-process implementations
pub mod memory;

/// SQLite implementation
pub mod sqlite;

/// REST chat directory
pub mod http;

pub use http::HttpChatDirectory;
pub use memory::{InMemoryChatDirectory, InMemoryMessageStore};
pub use sqlite::SqliteStore;

/// A message accepted by the gateway but not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub content: String,
    pub is_attachment: bool,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
}

impl From<AddMessageDto> for NewMessage {
    fn from(dto: AddMessageDto) -> Self {
        Self {
            chat_id: dto.chat_id,
            user_id: dto.user_id,
            content: dto.content,
            is_attachment: dto.is_attachment,
            file_url: dto.file_url,
            file_name: dto.file_name,
            file_size: dto.file_size,
            file_type: dto.file_type,
        }
    }
}

/// Durable message storage
///
/// Ids returned by `insert` must be strictly increasing in insertion order.
/// Storage failures are reported as `HubError::PersistenceError`.
pub trait MessageStore: Send + Sync {
    /// Store a new message and return the stored row with its id
    fn insert(&self, message: NewMessage) -> BoxFuture<'_, Result<ChatMessage, HubError>>;

    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<Option<ChatMessage>, HubError>>;

    /// Replace the content of a message and stamp `editedAt`
    fn update_content(
        &self,
        id: MessageId,
        content: String,
    ) -> BoxFuture<'_, Result<ChatMessage, HubError>>;

    /// Soft-delete: replace content with the tombstone, keep the row
    fn tombstone(&self, id: MessageId) -> BoxFuture<'_, Result<ChatMessage, HubError>>;

    /// All rows of a chat in id order, tombstones included
    fn list_by_chat(&self, chat_id: ChatId) -> BoxFuture<'_, Result<Vec<ChatMessage>, HubError>>;
}

/// Source of truth for chat membership
pub trait ChatDirectory: Send + Sync {
    fn is_member(&self, user_id: UserId, chat_id: ChatId) -> BoxFuture<'_, Result<bool, HubError>>;
}
