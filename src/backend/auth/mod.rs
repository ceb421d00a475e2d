//! Authentication Module
//!
//! This module turns the bearer credential a client presents at handshake
//! into an [`Identity`] the hub can bind to a connection. Token issuance and
//! user registration belong to the REST collaborator; the hub only verifies.
//!
//! # Architecture
//!
//! - **`sessions`** - JWT claims, verification and (for tooling/tests) issuance
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Identity, Authenticator trait
//! └── sessions.rs     - JWT token management
//! ```
//!
//! # Authentication Flow
//!
//! 1. Client resolves a fresh token (never cached across attempts)
//! 2. Token arrives as `access_token` query, `Authorization: Bearer`, or
//!    a `handshake` frame
//! 3. `Authenticator::authenticate` verifies signature and expiry
//! 4. The resulting `Identity` is stored with the connection for its lifetime

use chrono::{DateTime, Utc};

use crate::shared::{HubError, UserId};

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{create_token, Claims, JwtAuthenticator};

/// Authenticated identity bound to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Credential expiry; the connection is closed once this passes
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Verifies bearer credentials presented at handshake
pub trait Authenticator: Send + Sync {
    /// Resolve a token into an identity.
    ///
    /// Fails with `HubError::AuthenticationError` when the token is
    /// malformed, has a bad signature or is expired.
    fn authenticate(&self, token: &str) -> Result<Identity, HubError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
