//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the hub and its clients. These types are used for serialization and
//! communication over the hub's persistent connection.
//!
//! # Overview
//!
//! The shared module provides transport-agnostic types that can be used
//! in both server and client code. All wire types are designed for JSON
//! serialization.

/// Message records, events and DTOs
pub mod message;

/// Server-to-client hub events
pub mod event;

/// Client and server frames
pub mod protocol;

/// Shared error types
pub mod error;

/// Hub configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use message::{
    AddMessageDto, ChatId, ChatMessage, EventKind, MessageEvent, MessageId, UpdateMessageDto,
    UserId,
};
pub use event::HubEvent;
pub use protocol::{ClientFrame, ConnectionId, HubCall, ServerFrame};
pub use error::{ErrorKind, ErrorPayload, HubError};
pub use config::{ConfigError, HubConfig, HubConfigBuilder};
