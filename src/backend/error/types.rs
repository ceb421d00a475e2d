/**
 * Backend Error Types
 *
 * HTTP-facing errors of the hub server. Hub operations fail with the shared
 * `HubError` taxonomy; this type wraps it together with the failures that
 * only exist on the server side (startup configuration, socket binding,
 * request handling).
 *
 * # Status Mapping
 *
 * - Authentication - 401 Unauthorized
 * - Authorization - 403 Forbidden
 * - Validation - 400 Bad Request
 * - Not found - 404 Not Found
 * - Persistence - 503 Service Unavailable
 * - Transport - 502 Bad Gateway
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::{ConfigError, HubError};

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing headers, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Failure reported by a hub operation
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Invalid or unreadable configuration at startup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Hub(err) => match err {
                HubError::AuthenticationError { .. } => StatusCode::UNAUTHORIZED,
                HubError::AuthorizationError { .. } => StatusCode::FORBIDDEN,
                HubError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                HubError::NotFoundError { .. } => StatusCode::NOT_FOUND,
                HubError::PersistenceError { .. } => StatusCode::SERVICE_UNAVAILABLE,
                HubError::TransportError { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Config(_) | Self::Io(_) | Self::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Hub(err) => err.to_string(),
            Self::Config(err) => err.to_string(),
            Self::Io(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
