//! Backend Module
//!
//! This module contains all server-side code for the chat hub: a realtime
//! messaging hub with group-based broadcast, served over WebSocket beside a
//! small REST surface.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`hub`** - Connection registry, group table, gateway, dispatcher
//! - **`realtime`** - Session loop and WebSocket transport
//! - **`persistence`** - Message store and chat directory collaborators
//! - **`auth`** - Bearer-token verification
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`middleware`** - Request authentication
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── hub/            - Realtime hub core
//! ├── realtime/       - Connection serving
//! ├── persistence/    - Collaborators (memory, SQLite, REST)
//! ├── auth/           - JWT verification
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # Thread Safety
//!
//! The hub is shared as `Arc<Hub>`. Connection and room state sit behind
//! `tokio::sync` locks scoped per room, so traffic in one chat never waits
//! on another. Per-connection delivery goes through bounded `mpsc`
//! mailboxes.

/// Realtime hub core
#[cfg(feature = "ssr")]
pub mod hub;

/// Connection serving
#[cfg(feature = "ssr")]
pub mod realtime;

/// Persistence collaborators
#[cfg(feature = "ssr")]
pub mod persistence;

/// Authentication
#[cfg(feature = "ssr")]
pub mod auth;

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use hub::{Hub, HubStats};
#[cfg(feature = "ssr")]
pub use server::{create_app, ServerConfig};
