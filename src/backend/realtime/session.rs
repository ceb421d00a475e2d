/**
 * Hub Session Loop
 *
 * Drives one client connection from handshake to teardown, independent of
 * the transport. The transport hands in a stream of decoded client frames
 * and the sending half of the connection's outbound mailbox; everything the
 * client sees, including room events, arrives through that mailbox.
 *
 * # Lifecycle
 *
 * 1. Handshake: use the token given at upgrade, or wait for a `handshake`
 *    frame. Bounded by `handshake_timeout`.
 * 2. Register with the hub and acknowledge with the connection id.
 * 3. Serve invocations one at a time, answering each with a completion.
 * 4. Keep-alive pings go out every `keep_alive_interval`; any inbound
 *    frame counts as liveness and silence beyond `client_timeout` closes.
 * 5. Whatever ends the loop, the connection is unregistered.
 */

use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tokio::time::{interval_at, sleep, timeout, Instant};

use crate::backend::hub::{Hub, Outbound};
use crate::shared::{ClientFrame, ConnectionId, HubError, ServerFrame};

/// Why a registered session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Inbound stream finished (client closed or transport failed)
    ClientClosed,
    /// Nothing heard from the client within `client_timeout`
    TimedOut,
    /// Credential expired or the hub dropped the connection
    Revoked,
    /// Writer side of the transport went away
    OutboundClosed,
    Shutdown,
}

/// Run a session to completion.
///
/// Returns `Err` only when the handshake fails; a close frame carrying the
/// reason has already been queued in that case.
pub async fn run_session<S>(
    hub: Arc<Hub>,
    token: Option<String>,
    mut inbound: S,
    outbound: Outbound,
) -> Result<SessionEnd, HubError>
where
    S: Stream<Item = Result<ClientFrame, HubError>> + Unpin + Send,
{
    let connection_id = match handshake(&hub, token, &mut inbound, &outbound).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("[Session] Handshake rejected: {}", e);
            let _ = outbound.try_send(ServerFrame::close(e.to_string()));
            return Err(e);
        }
    };

    let end = serve(&hub, connection_id, &mut inbound, &outbound).await;
    hub.unregister(connection_id).await;
    tracing::info!("[Session] Connection {} ended: {:?}", connection_id, end);
    Ok(end)
}

async fn handshake<S>(
    hub: &Hub,
    token: Option<String>,
    inbound: &mut S,
    outbound: &Outbound,
) -> Result<ConnectionId, HubError>
where
    S: Stream<Item = Result<ClientFrame, HubError>> + Unpin + Send,
{
    let config = hub.config();
    let attempt = async {
        let token = match token {
            Some(token) => token,
            None => match inbound.next().await {
                Some(Ok(ClientFrame::Handshake { access_token })) => access_token,
                Some(Ok(_)) => return Err(HubError::authentication("expected handshake frame")),
                Some(Err(e)) => return Err(HubError::authentication(format!("bad handshake: {}", e))),
                None => return Err(HubError::authentication("connection closed during handshake")),
            },
        };
        let connection_id = hub.register(&token, outbound.clone()).await?;
        outbound
            .send(ServerFrame::HandshakeAck { connection_id })
            .await
            .map_err(|_| HubError::transport("connection closed during handshake"))?;
        Ok::<_, HubError>(connection_id)
    };

    match timeout(config.handshake_timeout, attempt).await {
        Ok(Ok(connection_id)) => Ok(connection_id),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(HubError::authentication("handshake timed out")),
    }
}

async fn serve<S>(
    hub: &Hub,
    connection_id: ConnectionId,
    inbound: &mut S,
    outbound: &Outbound,
) -> SessionEnd
where
    S: Stream<Item = Result<ClientFrame, HubError>> + Unpin + Send,
{
    let config = hub.config();
    let idle = sleep(config.client_timeout);
    tokio::pin!(idle);
    let mut keep_alive = interval_at(
        Instant::now() + config.keep_alive_interval,
        config.keep_alive_interval,
    );
    let mut shutdown = hub.shutdown_signal();
    if *shutdown.borrow_and_update() {
        return SessionEnd::Shutdown;
    }

    loop {
        tokio::select! {
            frame = inbound.next() => {
                idle.as_mut().reset(Instant::now() + config.client_timeout);
                match frame {
                    None => return SessionEnd::ClientClosed,
                    Some(Err(e)) => {
                        tracing::debug!("[Session] Unreadable frame from {}: {}", connection_id, e);
                        let _ = outbound.send(ServerFrame::failed(None, &e)).await;
                    }
                    Some(Ok(ClientFrame::Ping)) => {
                        let _ = outbound.try_send(ServerFrame::Pong);
                    }
                    Some(Ok(ClientFrame::Handshake { .. })) => {
                        tracing::debug!("[Session] Ignoring repeated handshake from {}", connection_id);
                    }
                    Some(Ok(ClientFrame::Invocation { invocation_id, call })) => {
                        let completion = match hub.invoke(connection_id, call).await {
                            Ok(result) => ServerFrame::completed(invocation_id, result),
                            Err(e) => {
                                let frame = ServerFrame::failed(invocation_id, &e);
                                if is_fatal(hub, connection_id, &e).await {
                                    let _ = outbound.send(frame).await;
                                    hub.disconnect(connection_id, &e.to_string()).await;
                                    return SessionEnd::Revoked;
                                }
                                frame
                            }
                        };
                        if outbound.send(completion).await.is_err() {
                            return SessionEnd::OutboundClosed;
                        }
                    }
                }
            }
            _ = &mut idle => {
                tracing::info!("[Session] Connection {} timed out", connection_id);
                hub.disconnect(connection_id, "client timed out").await;
                return SessionEnd::TimedOut;
            }
            _ = keep_alive.tick() => {
                if let Err(e) = outbound.try_send(ServerFrame::Ping) {
                    tracing::debug!("[Session] Keep-alive to {} not queued: {}", connection_id, e);
                }
            }
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            _ = outbound.closed() => return SessionEnd::OutboundClosed,
        }
    }
}

/// Errors after which the connection must not stay open
async fn is_fatal(hub: &Hub, connection_id: ConnectionId, error: &HubError) -> bool {
    match error {
        HubError::AuthenticationError { .. } => true,
        HubError::NotFoundError { .. } => hub.lookup(connection_id).await.is_err(),
        _ => false,
    }
}
