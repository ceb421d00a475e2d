//! Real-time Connection Module
//!
//! Serves hub connections. The session loop is written against a stream of
//! decoded frames and an outbound mailbox, so the WebSocket adapter and the
//! in-process client connector share it unchanged.
//!
//! # Architecture
//!
//! - **`session`** - Handshake, heartbeat, invocation loop, teardown
//! - **`websocket`** - Axum WebSocket upgrade handler
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── session.rs      - Transport-agnostic session loop
//! └── websocket.rs    - WebSocket transport
//! ```
//!
//! # Frame Flow
//!
//! ```text
//! socket reader -> ClientFrame stream -> run_session -> Hub
//!                                                       |
//! socket writer <- mpsc mailbox <--- completions, events, pings
//! ```

pub mod session;
pub mod websocket;

pub use session::{run_session, SessionEnd};
pub use websocket::hub_socket;
