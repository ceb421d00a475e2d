//! SQLite persistence
//!
//! Implements both collaborator traits on one pool. The schema mirrors the
//! REST backend's `messages` and `chat_users` tables closely enough for the
//! hub: soft-deleted rows stay in place with `is_deleted = 1`.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::{ChatDirectory, MessageStore, NewMessage};
use crate::shared::message::TOMBSTONE;
use crate::shared::{ChatId, ChatMessage, HubError, MessageId, UserId};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        is_attachment INTEGER NOT NULL DEFAULT 0,
        file_url TEXT,
        file_name TEXT,
        file_size INTEGER,
        file_type TEXT,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        sent_at TEXT NOT NULL,
        edited_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages (chat_id, id)",
    "CREATE TABLE IF NOT EXISTS chat_users (
        chat_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        joined_at TEXT NOT NULL,
        PRIMARY KEY (chat_id, user_id)
    )",
];

const MESSAGE_COLUMNS: &str = "id, chat_id, user_id, content, is_attachment, file_url, file_name, \
     file_size, file_type, is_deleted, sent_at, edited_at";

impl From<sqlx::Error> for HubError {
    fn from(err: sqlx::Error) -> Self {
        HubError::persistence(format!("database error: {}", err))
    }
}

/// Message store and chat directory on a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema if needed.
    ///
    /// In-memory URLs (`sqlite::memory:`) are limited to one connection so
    /// every query sees the same database.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Record (or restore) a user's membership in a chat
    pub async fn add_chat_user(&self, chat_id: ChatId, user_id: UserId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_users (chat_id, user_id, is_deleted, joined_at)
             VALUES (?, ?, 0, ?)
             ON CONFLICT (chat_id, user_id) DO UPDATE SET is_deleted = 0",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-remove a user's membership
    pub async fn remove_chat_user(&self, chat_id: ChatId, user_id: UserId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chat_users SET is_deleted = 1 WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_message(&self, id: MessageId) -> Result<Option<ChatMessage>, HubError> {
        let query = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_message).transpose()
    }

    async fn fetch_existing(&self, id: MessageId) -> Result<ChatMessage, HubError> {
        self.fetch_message(id)
            .await?
            .ok_or_else(|| HubError::not_found("message", id))
    }
}

fn row_to_message(row: &SqliteRow) -> Result<ChatMessage, HubError> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        is_attachment: row.try_get("is_attachment")?,
        file_url: row.try_get("file_url")?,
        file_name: row.try_get("file_name")?,
        file_size: row.try_get("file_size")?,
        file_type: row.try_get("file_type")?,
        is_deleted: row.try_get("is_deleted")?,
        sent_at: row.try_get::<DateTime<Utc>, _>("sent_at")?,
        edited_at: row.try_get::<Option<DateTime<Utc>>, _>("edited_at")?,
    })
}

impl MessageStore for SqliteStore {
    fn insert(&self, message: NewMessage) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            let result = sqlx::query(
                "INSERT INTO messages (chat_id, user_id, content, is_attachment, file_url,
                     file_name, file_size, file_type, is_deleted, sent_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(message.chat_id)
            .bind(message.user_id)
            .bind(&message.content)
            .bind(message.is_attachment)
            .bind(&message.file_url)
            .bind(&message.file_name)
            .bind(message.file_size)
            .bind(&message.file_type)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

            self.fetch_existing(result.last_insert_rowid()).await
        }
        .boxed()
    }

    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<Option<ChatMessage>, HubError>> {
        self.fetch_message(id).boxed()
    }

    fn update_content(
        &self,
        id: MessageId,
        content: String,
    ) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            let result = sqlx::query("UPDATE messages SET content = ?, edited_at = ? WHERE id = ?")
                .bind(&content)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(HubError::not_found("message", id));
            }
            self.fetch_existing(id).await
        }
        .boxed()
    }

    fn tombstone(&self, id: MessageId) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
        async move {
            let result = sqlx::query("UPDATE messages SET content = ?, is_deleted = 1 WHERE id = ?")
                .bind(TOMBSTONE)
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(HubError::not_found("message", id));
            }
            self.fetch_existing(id).await
        }
        .boxed()
    }

    fn list_by_chat(&self, chat_id: ChatId) -> BoxFuture<'_, Result<Vec<ChatMessage>, HubError>> {
        async move {
            let query = format!(
                "SELECT {} FROM messages WHERE chat_id = ? ORDER BY id ASC",
                MESSAGE_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(chat_id)
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(row_to_message).collect()
        }
        .boxed()
    }
}

impl ChatDirectory for SqliteStore {
    fn is_member(&self, user_id: UserId, chat_id: ChatId) -> BoxFuture<'_, Result<bool, HubError>> {
        async move {
            let row: Option<(i64,)> = sqlx::query_as(
                "SELECT 1 FROM chat_users WHERE chat_id = ? AND user_id = ? AND is_deleted = 0",
            )
            .bind(chat_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.is_some())
        }
        .boxed()
    }
}
