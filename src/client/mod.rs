//! Client Module
//!
//! Client side of the hub connection: a reconnecting [`HubSession`] driven
//! by an explicit state machine, the [`Connector`] seam it opens links
//! through, and the backoff policy between attempts.
//!
//! ```rust,no_run
//! use chathub::client::{HubSession, ReconnectPolicy, WsConnector};
//!
//! # async fn demo() -> Result<(), chathub::shared::HubError> {
//! let connector = WsConnector::new("ws://localhost:3000/hubs/message")?;
//! let session = HubSession::new(connector, || std::env::var("CHAT_TOKEN").ok(), ReconnectPolicy::default());
//! session.start().await;
//! session.join(7).await?;
//! # Ok(())
//! # }
//! ```

/// Reconnect delays
pub mod backoff;

/// Link and credential seams
pub mod connector;

/// Session lifecycle driver
pub mod session;

/// Session states and notices
pub mod state;

/// WebSocket transport
pub mod websocket;

pub use backoff::ReconnectPolicy;
#[cfg(feature = "ssr")]
pub use connector::InProcessConnector;
pub use connector::{Connector, Link, TokenProvider};
pub use session::{HubSession, SessionOptions};
pub use state::{SessionNotice, SessionState};
pub use websocket::WsConnector;
