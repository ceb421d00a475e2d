/**
 * WebSocket Connector
 *
 * Opens a hub link over WebSocket. The access token travels as the
 * `access_token` query parameter of the upgrade request, and two bridge
 * tasks translate between text frames and the link channels. Dropping the
 * link's sender closes the socket.
 */
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::connector::{Connector, Link};
use crate::shared::{ClientFrame, HubError, ServerFrame};

const LINK_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    /// `url` is the hub endpoint, e.g. `ws://localhost:3000/hubs/message`
    pub fn new(url: &str) -> Result<Self, HubError> {
        let url = Url::parse(url).map_err(|e| HubError::validation("url", e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(HubError::validation(
                "url",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    fn endpoint(&self, token: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("access_token", token);
        url
    }
}

impl Connector for WsConnector {
    fn connect(&self, token: String) -> BoxFuture<'_, Result<Link, HubError>> {
        async move {
            let endpoint = self.endpoint(&token);
            tracing::debug!("[Client] Opening WebSocket to {}", self.url);

            let (socket, _response) = connect_async(endpoint.as_str())
                .await
                .map_err(|e| HubError::transport(format!("WebSocket connect failed: {}", e)))?;
            let (mut sink, mut stream) = socket.split();

            let (client_tx, mut client_rx) = mpsc::channel::<ClientFrame>(LINK_CAPACITY);
            let (server_tx, server_rx) = mpsc::channel::<ServerFrame>(LINK_CAPACITY);

            tokio::spawn(async move {
                while let Some(frame) = client_rx.recv().await {
                    let text = match frame.to_text() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("[Client] Dropping unencodable frame: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                let _ = sink.send(Message::Close(None)).await;
            });

            tokio::spawn(async move {
                while let Some(message) = stream.next().await {
                    let frame = match message {
                        Ok(Message::Text(text)) => match ServerFrame::from_text(&text) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::warn!("[Client] Ignoring malformed server frame: {}", e);
                                continue;
                            }
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::debug!("[Client] WebSocket read failed: {}", e);
                            break;
                        }
                    };
                    if server_tx.send(frame).await.is_err() {
                        break;
                    }
                }
            });

            Ok(Link {
                outbound: client_tx,
                inbound: server_rx,
            })
        }
        .boxed()
    }
}
