/**
 * WebSocket Transport
 *
 * Upgrade handler for `GET /hubs/message`. Each text (or UTF-8 binary)
 * message carries one JSON frame. The socket is split: a writer task drains
 * the connection's outbound mailbox while the session loop reads frames.
 *
 * # Authentication
 *
 * The token may be given as `?access_token=` (browsers cannot set headers
 * on a WebSocket upgrade), as `Authorization: Bearer`, or in a `handshake`
 * frame after the upgrade.
 */

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures_util::{future, SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::session::run_session;
use crate::backend::auth::bearer_token;
use crate::backend::hub::Hub;
use crate::shared::{ClientFrame, HubError, ServerFrame};

#[derive(Debug, Default, Deserialize)]
pub struct HubQuery {
    pub access_token: Option<String>,
}

/// Handle a hub connection upgrade (GET /hubs/message)
pub async fn hub_socket(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<Hub>>,
    Query(query): Query<HubQuery>,
    headers: HeaderMap,
) -> Response {
    let token = query.access_token.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string)
    });

    ws.on_upgrade(move |socket| serve_socket(socket, hub, token))
}

async fn serve_socket(socket: WebSocket, hub: Arc<Hub>, token: Option<String>) {
    let (mut sender, receiver) = socket.split();
    let (outbound, mut mailbox) = mpsc::channel::<ServerFrame>(hub.config().outbound_capacity);

    let writer = tokio::spawn(async move {
        while let Some(frame) = mailbox.recv().await {
            let closing = matches!(frame, ServerFrame::Close { .. });
            match frame.to_text() {
                Ok(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!("[Session] Failed to encode frame: {}", e),
            }
            if closing {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let inbound = receiver
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)) | Err(_))))
        .filter_map(|message| future::ready(decode(message)));
    let inbound = std::pin::pin!(inbound);

    if let Err(e) = run_session(hub, token, inbound, outbound).await {
        tracing::debug!("[Session] WebSocket session refused: {}", e);
    }

    // Ends once the hub has released its copy of the mailbox sender
    if let Err(e) = writer.await {
        tracing::warn!("[Session] WebSocket writer task failed: {}", e);
    }
}

fn decode(message: Result<Message, axum::Error>) -> Option<Result<ClientFrame, HubError>> {
    match message {
        Ok(Message::Text(text)) => Some(ClientFrame::from_text(text.as_str())),
        Ok(Message::Binary(bytes)) => Some(
            std::str::from_utf8(&bytes)
                .map_err(|_| HubError::validation("frame", "binary frame is not UTF-8"))
                .and_then(ClientFrame::from_text),
        ),
        _ => None,
    }
}
