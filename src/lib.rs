// Increase recursion limit for nested select!/async blocks
#![recursion_limit = "256"]

//! Chathub - Main Library
//!
//! Chathub is a realtime chat delivery hub: clients hold one persistent
//! connection each, join the rooms of the chats they belong to, and receive
//! every message created, edited or deleted in those rooms in submit order.
//!
//! # Module Structure
//!
//! The library is organized into three main modules:
//!
//! - **`shared`** - Types shared between the hub and its clients
//!   - Message records, hub events, wire frames
//!   - Error taxonomy
//!   - Hub configuration
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Connection registry and group membership table
//!   - Message gateway and broadcast dispatcher
//!   - Axum WebSocket endpoint and REST routes
//!   - JWT verification and persistence collaborators
//!
//! - **`client`** - Reconnecting client session
//!   - Explicit connect/reconnect state machine
//!   - Exponential backoff
//!   - WebSocket and in-process connectors
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use chathub::backend::{create_app, ServerConfig};
//!
//! # async fn example() -> Result<(), chathub::backend::BackendError> {
//! let config = ServerConfig::from_env()?;
//! let (app, hub) = create_app(&config).await?;
//! // Serve `app` with axum, then `hub.shutdown().await` on exit
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - **Server**: hub state lives behind per-room `tokio::sync` locks and
//!   bounded per-connection `mpsc` mailboxes, shared as `Arc<Hub>`
//! - **Client**: one driver task per session owns the link; callers talk
//!   to it through channels
//!
//! # Error Handling
//!
//! - `HubError` in `shared::error` for hub and client operations
//! - `BackendError` in `backend::error` for HTTP handlers and startup

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

/// Hub client
pub mod client;
