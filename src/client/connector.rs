//! Connectors and token providers
//!
//! A [`Connector`] opens one transport link to the hub and returns it as a
//! pair of channels. The session driver owns reconnection; a connector only
//! ever makes a single attempt.

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::shared::{ClientFrame, HubError, ServerFrame};

/// Frames to and from one open transport
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<ClientFrame>,
    pub inbound: mpsc::Receiver<ServerFrame>,
}

pub trait Connector: Send + Sync {
    /// Open a link presenting `token`. The handshake acknowledgement arrives
    /// on `Link::inbound` like any other frame.
    fn connect(&self, token: String) -> BoxFuture<'_, Result<Link, HubError>>;
}

/// Resolves a fresh credential for every connect attempt
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

#[cfg(feature = "ssr")]
pub use in_process::InProcessConnector;

#[cfg(feature = "ssr")]
mod in_process {
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;
    use tokio_stream::StreamExt;

    use super::{Connector, Link};
    use crate::backend::hub::Hub;
    use crate::backend::realtime::run_session;
    use crate::shared::HubError;

    const LINK_CAPACITY: usize = 64;

    /// Connects to a hub in the same process through the server session loop
    #[derive(Clone)]
    pub struct InProcessConnector {
        hub: Arc<Hub>,
    }

    impl InProcessConnector {
        pub fn new(hub: Arc<Hub>) -> Self {
            Self { hub }
        }
    }

    impl Connector for InProcessConnector {
        fn connect(&self, token: String) -> BoxFuture<'_, Result<Link, HubError>> {
            async move {
                if self.hub.is_shutting_down() {
                    return Err(HubError::transport("hub is shutting down"));
                }
                let (client_tx, client_rx) = mpsc::channel(LINK_CAPACITY);
                let (server_tx, server_rx) = mpsc::channel(self.hub.config().outbound_capacity);

                let frames = ReceiverStream::new(client_rx).map(Ok);
                tokio::spawn(run_session(self.hub.clone(), Some(token), frames, server_tx));

                Ok(Link {
                    outbound: client_tx,
                    inbound: server_rx,
                })
            }
            .boxed()
        }
    }
}
