//! Common test utilities and helpers
//!
//! - A hub over in-memory collaborators with chats 7 and 8 populated
//! - Token minting
//! - Raw hub connections backed by a receiving mailbox
//! - A store that suspends after every write, so concurrent writes to one
//!   chat really interleave

#[cfg(feature = "ssr")]
pub use hub_fixture::*;

#[cfg(feature = "ssr")]
mod hub_fixture {
    use chathub::backend::auth::{create_token, JwtAuthenticator};
    use chathub::backend::hub::Hub;
    use chathub::backend::persistence::{
        InMemoryChatDirectory, InMemoryMessageStore, MessageStore, NewMessage,
    };
    use chathub::shared::{
        ChatId, ChatMessage, ConnectionId, HubConfig, HubError, HubEvent, MessageEvent, MessageId,
        ServerFrame,
    };
    use chrono::{Duration, Utc};
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};

    pub const SECRET: &str = "integration-secret";
    pub const ROOM: i64 = 7;
    pub const OTHER_ROOM: i64 = 8;

    pub struct TestHub {
        pub hub: Arc<Hub>,
        pub store: Arc<InMemoryMessageStore>,
        pub directory: Arc<InMemoryChatDirectory>,
    }

    /// Users 1, 2 and 3 belong to room 7; users 1 and 4 to room 8
    pub async fn test_hub() -> TestHub {
        test_hub_with(HubConfig::default()).await
    }

    pub async fn test_hub_with(config: HubConfig) -> TestHub {
        let store = Arc::new(InMemoryMessageStore::new());
        let directory = Arc::new(InMemoryChatDirectory::new());
        for user in [1, 2, 3] {
            directory.add_member(ROOM, user).await;
        }
        for user in [1, 4] {
            directory.add_member(OTHER_ROOM, user).await;
        }
        let hub = Arc::new(Hub::new(
            config,
            Arc::new(JwtAuthenticator::new(SECRET)),
            store.clone(),
            directory.clone(),
        ));
        TestHub {
            hub,
            store,
            directory,
        }
    }

    /// In-memory store that records each write as the event it should
    /// produce, then sleeps a few milliseconds before answering
    pub struct JitteryStore {
        inner: InMemoryMessageStore,
        commits: Mutex<Vec<HubEvent>>,
        calls: AtomicU64,
    }

    impl JitteryStore {
        pub fn new() -> Self {
            Self {
                inner: InMemoryMessageStore::new(),
                commits: Mutex::new(Vec::new()),
                calls: AtomicU64::new(0),
            }
        }

        /// Events in the order their writes committed, clearing the log
        pub async fn take_commits(&self) -> Vec<HubEvent> {
            std::mem::take(&mut *self.commits.lock().await)
        }

        async fn jitter(&self) {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(std::time::Duration::from_millis((n * 7) % 11)).await;
        }

        async fn commit<F>(
            &self,
            write: F,
            event: fn(ChatMessage) -> MessageEvent,
        ) -> Result<ChatMessage, HubError>
        where
            F: std::future::Future<Output = Result<ChatMessage, HubError>>,
        {
            let stored = {
                let mut commits = self.commits.lock().await;
                let stored = write.await?;
                commits.push(HubEvent::from(&event(stored.clone())));
                stored
            };
            self.jitter().await;
            Ok(stored)
        }
    }

    impl MessageStore for JitteryStore {
        fn insert(&self, message: NewMessage) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
            self.commit(self.inner.insert(message), MessageEvent::created).boxed()
        }

        fn get(&self, id: MessageId) -> BoxFuture<'_, Result<Option<ChatMessage>, HubError>> {
            self.inner.get(id)
        }

        fn update_content(
            &self,
            id: MessageId,
            content: String,
        ) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
            self.commit(self.inner.update_content(id, content), MessageEvent::edited).boxed()
        }

        fn tombstone(&self, id: MessageId) -> BoxFuture<'_, Result<ChatMessage, HubError>> {
            self.commit(self.inner.tombstone(id), MessageEvent::deleted).boxed()
        }

        fn list_by_chat(&self, chat_id: ChatId) -> BoxFuture<'_, Result<Vec<ChatMessage>, HubError>> {
            self.inner.list_by_chat(chat_id)
        }
    }

    pub struct JitteryHub {
        pub hub: Arc<Hub>,
        pub store: Arc<JitteryStore>,
    }

    /// Same membership as [`test_hub`], over a [`JitteryStore`]
    pub async fn jittery_hub() -> JitteryHub {
        let store = Arc::new(JitteryStore::new());
        let directory = Arc::new(InMemoryChatDirectory::new());
        for user in [1, 2, 3] {
            directory.add_member(ROOM, user).await;
        }
        let hub = Arc::new(Hub::new(
            HubConfig::default(),
            Arc::new(JwtAuthenticator::new(SECRET)),
            store.clone(),
            directory,
        ));
        JitteryHub { hub, store }
    }

    pub fn token(user_id: i64) -> String {
        create_token(SECRET, user_id, Utc::now() + Duration::hours(1))
            .expect("Failed to create test token")
    }

    /// A registered connection and the frames the hub queues for it
    pub struct Peer {
        pub id: ConnectionId,
        pub user_id: i64,
        pub mailbox: mpsc::Receiver<ServerFrame>,
    }

    impl Peer {
        /// Hub events queued so far, in delivery order
        pub fn drain_events(&mut self) -> Vec<HubEvent> {
            let mut events = Vec::new();
            while let Ok(frame) = self.mailbox.try_recv() {
                if let ServerFrame::Event { event } = frame {
                    events.push(event);
                }
            }
            events
        }
    }

    pub async fn connect(hub: &Hub, user_id: i64) -> Peer {
        let (tx, rx) = mpsc::channel(64);
        let id = hub
            .register(&token(user_id), tx)
            .await
            .expect("Failed to register test connection");
        Peer {
            id,
            user_id,
            mailbox: rx,
        }
    }
}
