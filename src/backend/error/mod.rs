//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! These errors are used in HTTP handlers and at startup, and can be
//! converted to HTTP responses.
//!
//! # Architecture
//!
//! - **`types`** - Error type definitions and status mapping
//! - **`conversion`** - `IntoResponse` implementation
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - Error conversion implementations
//! ```
//!
//! Hub failures keep their `HubError` kind all the way to the response, so a
//! REST caller sees the same taxonomy a hub client sees in a completion.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;
