//! Shared Error Types
//!
//! This module defines the error taxonomy used on both sides of the hub
//! connection. The hub reports these errors to the originating connection
//! inside completion frames, and the client session rebuilds them from the
//! wire payload so callers can match on the same variants.
//!
//! # Error Categories
//!
//! - `AuthenticationError` - Bad, missing or expired credential at handshake
//! - `AuthorizationError` - Room membership or edit/delete ownership violation
//! - `ValidationError` - Malformed or oversized content
//! - `NotFoundError` - Unknown connection, room or message
//! - `PersistenceError` - Storage layer failure
//! - `TransportError` - Network-level send/connect failure
//!
//! # Usage
//!
//! ```rust
//! use chathub::shared::error::HubError;
//!
//! let error = HubError::validation("content", "Message content cannot be empty");
//! assert_eq!(error.kind(), chathub::shared::error::ErrorKind::Validation);
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the realtime hub and its clients
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Credential absent, invalid or expired
    #[error("Authentication error: {message}")]
    AuthenticationError {
        /// Human-readable error message
        message: String,
    },

    /// Caller is not allowed to perform the operation
    #[error("Authorization error: {message}")]
    AuthorizationError {
        /// Human-readable error message
        message: String,
    },

    /// Input failed validation
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFoundError {
        /// Kind of entity (connection, room, message)
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Storage layer failure
    #[error("Persistence error: {message}")]
    PersistenceError {
        /// Human-readable error message
        message: String,
    },

    /// Network-level failure
    #[error("Transport error: {message}")]
    TransportError {
        /// Human-readable error message
        message: String,
    },
}

/// Discriminant of [`HubError`] carried on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Persistence,
    Transport,
}

/// Error as sent inside a completion frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl HubError {
    /// Create a new authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationError {
            message: message.into(),
        }
    }

    /// Create a new authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::AuthorizationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFoundError {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Wire discriminant for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationError { .. } => ErrorKind::Authentication,
            Self::AuthorizationError { .. } => ErrorKind::Authorization,
            Self::ValidationError { .. } => ErrorKind::Validation,
            Self::NotFoundError { .. } => ErrorKind::NotFound,
            Self::PersistenceError { .. } => ErrorKind::Persistence,
            Self::TransportError { .. } => ErrorKind::Transport,
        }
    }

    /// Convert into the payload sent to the originating connection
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<ErrorPayload> for HubError {
    /// Rebuild an error received from the hub.
    ///
    /// The original field/entity detail is folded into the message, so a
    /// rebuilt validation error reports the field as `remote`.
    fn from(payload: ErrorPayload) -> Self {
        match payload.kind {
            ErrorKind::Authentication => Self::authentication(payload.message),
            ErrorKind::Authorization => Self::authorization(payload.message),
            ErrorKind::Validation => Self::validation("remote", payload.message),
            ErrorKind::NotFound => Self::not_found("remote", payload.message),
            ErrorKind::Persistence => Self::persistence(payload.message),
            ErrorKind::Transport => Self::transport(payload.message),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation("frame", format!("JSON error: {}", err))
    }
}
