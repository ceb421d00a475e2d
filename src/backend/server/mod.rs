//! Server Module
//!
//! This module contains all server-side code for initializing and configuring
//! the Axum HTTP server around the hub.
//!
//! # Architecture
//!
//! The server module is organized into focused submodules:
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Configuration loading and validation
//! - **`init`** - Hub construction and app creation
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading (file, environment)
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env`
//! 2. **Collaborators**: message store and chat directory
//! 3. **Hub**: built once, shared as `Arc<Hub>`
//! 4. **Router Creation**: configures all routes and middleware

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::ServerConfig;
pub use init::{build_hub, create_app};
pub use state::AppState;
