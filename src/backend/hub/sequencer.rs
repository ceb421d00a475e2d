//! Per-chat sequencing point
//!
//! Submits, edits and deletes for one chat take that chat's lock for the
//! span of persist + enqueue, so stored ids and delivered order agree.
//! Different chats never share a lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::shared::ChatId;

/// Idle locks are dropped once the table grows past this many entries
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct ChatSequencer {
    locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

/// Held while a chat's event is persisted and handed to the dispatcher
pub type SequenceGuard = OwnedMutexGuard<()>;

impl ChatSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, chat_id: ChatId) -> SequenceGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(chat_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of chats with a lock entry
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
