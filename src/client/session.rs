//! # Hub Session
//!
//! Client-side connection lifecycle. One driver task owns the link and runs
//! an explicit loop:
//!
//! ```text
//! Connecting --ack--> Connected --lost--> Reconnecting --delay--> Connecting
//!      \--failure--> Reconnecting                  stop() from any state --> Disconnected
//! ```
//!
//! Every connect attempt asks the [`TokenProvider`] for a fresh credential.
//! Rooms joined through the session are remembered and re-joined on every
//! transition to `Connected`, since the hub forgets a connection's rooms
//! when it goes away.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_stream::wrappers::BroadcastStream;

use super::backoff::ReconnectPolicy;
use super::connector::{Connector, Link, TokenProvider};
use super::state::{SessionNotice, SessionState};
use crate::shared::{
    AddMessageDto, ChatId, ClientFrame, ConnectionId, HubCall, HubError, HubEvent, MessageId,
    ServerFrame, UpdateMessageDto,
};

const EVENT_CAPACITY: usize = 256;
const NOTICE_CAPACITY: usize = 64;

type Completion = Result<Option<Value>, HubError>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub policy: ReconnectPolicy,
    /// Wait for the hub's handshake acknowledgement
    pub handshake_timeout: Duration,
    /// Wait for the completion of one invocation
    pub invocation_timeout: Duration,
    /// Silence from the hub longer than this counts as a lost link
    pub server_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            handshake_timeout: Duration::from_secs(15),
            invocation_timeout: Duration::from_secs(30),
            server_timeout: Duration::from_secs(30),
        }
    }
}

/// How an established link ended
enum LinkEnd {
    Stopped,
    Lost(String),
}

struct Inner {
    connector: Box<dyn Connector>,
    tokens: Box<dyn TokenProvider>,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    stop: watch::Sender<bool>,
    events: broadcast::Sender<HubEvent>,
    notices: broadcast::Sender<SessionNotice>,
    rooms: Mutex<BTreeSet<ChatId>>,
    link: Mutex<Option<mpsc::Sender<ClientFrame>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Completion>>>,
    next_invocation: AtomicU64,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// A reconnecting client session against one hub
#[derive(Clone)]
pub struct HubSession {
    inner: Arc<Inner>,
}

impl HubSession {
    pub fn new(
        connector: impl Connector + 'static,
        tokens: impl TokenProvider + 'static,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::with_options(
            connector,
            tokens,
            SessionOptions {
                policy,
                ..SessionOptions::default()
            },
        )
    }

    pub fn with_options(
        connector: impl Connector + 'static,
        tokens: impl TokenProvider + 'static,
        options: SessionOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (stop, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                connector: Box::new(connector),
                tokens: Box::new(tokens),
                options,
                state,
                stop,
                events,
                notices,
                rooms: Mutex::new(BTreeSet::new()),
                link: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                next_invocation: AtomicU64::new(1),
                driver: Mutex::new(None),
            }),
        }
    }

    /// Start connecting in the background. Calling `start` on a running
    /// session does nothing.
    pub async fn start(&self) {
        let mut driver = self.inner.driver.lock().await;
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        self.inner.stop.send_replace(false);
        *driver = Some(tokio::spawn(self.inner.clone().drive()));
    }

    /// Stop the session and cancel any connect attempt or backoff wait.
    /// Safe to call repeatedly.
    pub async fn stop(&self) {
        self.inner.stop.send_replace(true);
        let handle = self.inner.driver.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("[Client] Session driver failed: {}", e);
            }
        }
        self.inner.state.send_replace(SessionState::Disconnected);
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the session reaches `Connected`
    pub async fn wait_connected(&self, within: Duration) -> Result<ConnectionId, HubError> {
        let mut state = self.inner.state.subscribe();
        let connected = timeout(within, async {
            state
                .wait_for(SessionState::is_connected)
                .await
                .map(|state| state.connection_id())
        })
        .await
        .map_err(|_| HubError::transport("timed out waiting for the hub connection"))?
        .map_err(|_| HubError::transport("session was dropped"))?;
        connected.ok_or_else(|| HubError::transport("session is not connected"))
    }

    /// Hub events for the rooms this session has joined. Dropping the stream
    /// unsubscribes.
    pub fn subscribe(&self) -> BroadcastStream<HubEvent> {
        BroadcastStream::new(self.inner.events.subscribe())
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    /// Rooms that are re-joined on every reconnect
    pub async fn active_rooms(&self) -> Vec<ChatId> {
        self.inner.rooms.lock().await.iter().copied().collect()
    }

    /// Join a room now if connected, otherwise on the next connect
    pub async fn join(&self, chat_id: ChatId) -> Result<(), HubError> {
        self.inner.rooms.lock().await.insert(chat_id);
        if !self.state().is_connected() {
            tracing::debug!("[Client] Deferring join of room {}", chat_id);
            return Ok(());
        }
        match self.inner.invoke(HubCall::AddToGroup(chat_id.to_string())).await {
            Ok(_) => Ok(()),
            // The room stays active and is joined on reconnect
            Err(HubError::TransportError { .. }) => Ok(()),
            Err(e) => {
                self.inner.rooms.lock().await.remove(&chat_id);
                Err(e)
            }
        }
    }

    pub async fn leave(&self, chat_id: ChatId) -> Result<(), HubError> {
        self.inner.rooms.lock().await.remove(&chat_id);
        if !self.state().is_connected() {
            return Ok(());
        }
        match self.inner.invoke(HubCall::RemoveFromGroup(chat_id.to_string())).await {
            Ok(_) | Err(HubError::TransportError { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Submit a message and return the id the hub assigned to it
    pub async fn send_message(&self, dto: AddMessageDto) -> Result<MessageId, HubError> {
        let result = self.inner.invoke(HubCall::SendMessage(dto)).await?;
        let value = result.ok_or_else(|| HubError::transport("hub returned no message id"))?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn edit_message(&self, id: MessageId, content: impl Into<String>) -> Result<(), HubError> {
        let dto = UpdateMessageDto {
            id,
            content: content.into(),
        };
        self.inner.invoke(HubCall::EditMessage(dto)).await.map(|_| ())
    }

    pub async fn delete_message(&self, id: MessageId) -> Result<(), HubError> {
        self.inner.invoke(HubCall::DeleteMessage(id)).await.map(|_| ())
    }
}

impl Inner {
    async fn drive(self: Arc<Self>) {
        let mut stop = self.stop.subscribe();
        let policy = self.options.policy.clone();
        let mut failures: u32 = 0;
        // Backoff sleeps since the last established link
        let mut retries: u32 = 0;

        loop {
            self.state.send_replace(SessionState::Connecting);
            let attempt = tokio::select! {
                result = self.establish() => result,
                _ = stopped(&mut stop) => break,
            };

            match attempt {
                Ok((connection_id, link)) => {
                    failures = 0;
                    retries = 0;
                    match self.run_link(connection_id, link, &mut stop).await {
                        LinkEnd::Stopped => break,
                        LinkEnd::Lost(reason) => {
                            tracing::warn!("[Client] Connection {} lost: {}", connection_id, reason);
                            let _ = self.notices.send(SessionNotice::Disconnected { reason });
                        }
                    }
                }
                Err(error) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!("[Client] Connect attempt {} failed: {}", failures, error);
                    let _ = self.notices.send(SessionNotice::AttemptFailed {
                        attempt: failures,
                        error,
                    });
                }
            }

            if !policy.allows(failures) {
                tracing::error!("[Client] Giving up after {} failed attempts", failures);
                let _ = self.notices.send(SessionNotice::Disconnected {
                    reason: format!("gave up after {} failed attempts", failures),
                });
                break;
            }

            let delay = policy.delay(retries);
            retries = retries.saturating_add(1);
            self.state.send_replace(SessionState::Reconnecting {
                attempt: failures.saturating_add(1),
            });
            tracing::info!("[Client] Reconnecting in {:?}", delay);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = stopped(&mut stop) => break,
            }
        }

        self.state.send_replace(SessionState::Disconnected);
        tracing::info!("[Client] Session stopped");
    }

    /// One connect attempt, through to the handshake acknowledgement
    async fn establish(&self) -> Result<(ConnectionId, Link), HubError> {
        let token = self
            .tokens
            .token()
            .ok_or_else(|| HubError::authentication("no access token available"))?;
        let mut link = self.connector.connect(token).await?;

        let first = timeout(self.options.handshake_timeout, link.inbound.recv())
            .await
            .map_err(|_| HubError::authentication("handshake timed out"))?;
        match first {
            Some(ServerFrame::HandshakeAck { connection_id }) => Ok((connection_id, link)),
            Some(ServerFrame::Close { reason }) => Err(HubError::authentication(reason)),
            Some(_) => Err(HubError::transport("unexpected frame before handshake acknowledgement")),
            None => Err(HubError::transport("connection closed during handshake")),
        }
    }

    async fn run_link(
        &self,
        connection_id: ConnectionId,
        link: Link,
        stop: &mut watch::Receiver<bool>,
    ) -> LinkEnd {
        let Link {
            outbound,
            mut inbound,
        } = link;

        *self.link.lock().await = Some(outbound.clone());
        self.state.send_replace(SessionState::Connected { connection_id });
        tracing::info!("[Client] Connected as {}", connection_id);

        let rooms: Vec<ChatId> = self.rooms.lock().await.iter().copied().collect();
        for chat_id in rooms {
            let frame = ClientFrame::Invocation {
                invocation_id: None,
                call: HubCall::AddToGroup(chat_id.to_string()),
            };
            if outbound.send(frame).await.is_err() {
                break;
            }
        }
        let _ = self.notices.send(SessionNotice::Connected(connection_id));

        let end = loop {
            tokio::select! {
                received = timeout(self.options.server_timeout, inbound.recv()) => match received {
                    Err(_) => break LinkEnd::Lost("hub stopped responding".to_string()),
                    Ok(None) => break LinkEnd::Lost("connection closed".to_string()),
                    Ok(Some(frame)) => {
                        if let Some(end) = self.route(frame, &outbound).await {
                            break end;
                        }
                    }
                },
                _ = stopped(stop) => break LinkEnd::Stopped,
            }
        };

        *self.link.lock().await = None;
        self.fail_pending("connection lost before completion").await;
        end
    }

    async fn route(&self, frame: ServerFrame, outbound: &mpsc::Sender<ClientFrame>) -> Option<LinkEnd> {
        match frame {
            ServerFrame::Event { event } => {
                tracing::debug!("[Client] Received {}", event.name());
                let _ = self.events.send(event);
            }
            ServerFrame::Completion {
                invocation_id: Some(id),
                result,
                error,
            } => {
                let waiter = self.pending.lock().await.remove(&id);
                if let Some(waiter) = waiter {
                    let completion = match error {
                        Some(payload) => Err(HubError::from(payload)),
                        None => Ok(result),
                    };
                    let _ = waiter.send(completion);
                }
            }
            ServerFrame::Completion {
                invocation_id: None,
                error: Some(error),
                ..
            } => {
                tracing::warn!("[Client] Hub rejected a request: {}", error.message);
            }
            ServerFrame::Completion { .. } | ServerFrame::Pong | ServerFrame::HandshakeAck { .. } => {}
            ServerFrame::Ping => {
                let _ = outbound.try_send(ClientFrame::Ping);
            }
            ServerFrame::Close { reason } => return Some(LinkEnd::Lost(reason)),
        }
        None
    }

    async fn invoke(&self, call: HubCall) -> Completion {
        let outbound = self
            .link
            .lock()
            .await
            .clone()
            .ok_or_else(|| HubError::transport("not connected to the hub"))?;

        let id = self.next_invocation.fetch_add(1, Ordering::Relaxed).to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if outbound.send(ClientFrame::invoke(id.clone(), call)).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(HubError::transport("connection lost"));
        }

        match timeout(self.options.invocation_timeout, rx).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(_)) => Err(HubError::transport("connection lost before completion")),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(HubError::transport("invocation timed out"))
            }
        }
    }

    async fn fail_pending(&self, reason: &str) {
        let mut pending = self.pending.lock().await;
        for (_, waiter) in pending.drain() {
            let _ = waiter.send(Err(HubError::transport(reason)));
        }
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
