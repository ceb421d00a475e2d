/**
 * Session Tokens
 *
 * This module verifies the JWT bearer tokens clients present at handshake.
 * Tokens are HS256-signed by the REST collaborator with the user id in
 * `sub`; the hub shares the secret and enforces `exp`.
 */

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{Authenticator, Identity};
use crate::shared::{HubError, UserId};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username (optional, informational only)
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Create a JWT token for a user
///
/// The hub never issues tokens to clients; this exists for operators and
/// tests that need a credential the hub will accept.
///
/// # Arguments
/// * `secret` - Shared HS256 secret
/// * `user_id` - User ID placed in `sub`
/// * `expires_at` - Expiry placed in `exp`
pub fn create_token(
    secret: &str,
    user_id: UserId,
    expires_at: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        username: None,
        exp: expires_at.timestamp().max(0) as u64,
        iat: now,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key)
}

/// Verifies HS256 tokens with a shared secret
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify and decode a JWT token
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity, HubError> {
        let claims = self.verify(token).map_err(|e| {
            tracing::warn!("[Auth] Rejected token: {}", e);
            HubError::authentication(format!("invalid token: {}", e))
        })?;

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| HubError::authentication("token subject is not a user id"))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp as i64, 0)
            .single()
            .ok_or_else(|| HubError::authentication("token expiry is out of range"))?;

        Ok(Identity {
            user_id,
            expires_at,
        })
    }
}
