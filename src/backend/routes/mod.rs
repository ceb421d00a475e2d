//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! # Architecture
//!
//! - **`router`** - Main router creation and route assembly
//! - **`api_routes`** - REST endpoints (health, stats, history)
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! └── api_routes.rs   - API endpoint handlers
//! ```
//!
//! The hub connection itself is served by `backend::realtime::websocket`.

pub mod api_routes;
pub mod router;

pub use router::{create_router, HUB_PATH};
