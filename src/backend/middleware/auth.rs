/**
 * Authentication Middleware
 *
 * This module provides middleware for protecting REST routes. It extracts
 * the bearer token from the Authorization header, verifies it with the
 * same authenticator the hub uses at handshake and attaches the resulting
 * identity to the request.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::backend::auth::{bearer_token, Identity};
use crate::backend::server::state::AppState;

/// Authentication middleware
///
/// Returns 401 Unauthorized if the token is missing, invalid or expired.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            tracing::warn!("Missing or malformed Authorization header");
            StatusCode::UNAUTHORIZED
        })?;

    let identity = app_state.authenticator.authenticate(token).map_err(|e| {
        tracing::warn!("Invalid token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Axum extractor for the identity attached by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("Identity not found in request extensions");
                StatusCode::UNAUTHORIZED
            })
    }
}
