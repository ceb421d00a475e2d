//! Middleware Module
//!
//! This module provides middleware for request processing.
//!
//! # Architecture
//!
//! The middleware module currently provides:
//!
//! - **`auth`** - Bearer-token authentication for REST routes

pub mod auth;

pub use auth::{auth_middleware, AuthUser};
