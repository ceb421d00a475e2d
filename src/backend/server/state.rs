/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct holds:
 * - The hub (`Arc<Hub>`), shared by the WebSocket handler and REST routes
 * - The authenticator used for bearer tokens on REST routes
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow Axum handlers to extract specific
 * parts of the state without needing the entire `AppState`.
 */

use axum::extract::FromRef;
use std::sync::Arc;

use crate::backend::auth::Authenticator;
use crate::backend::hub::Hub;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// The realtime hub
    pub hub: Arc<Hub>,

    /// Verifies bearer tokens on REST routes
    ///
    /// The same instance the hub uses for handshakes.
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>) -> Self {
        let authenticator = hub.authenticator().clone();
        Self { hub, authenticator }
    }
}

/// Implement FromRef for the hub
///
/// This allows the WebSocket handler to take `State<Arc<Hub>>` directly.
impl FromRef<AppState> for Arc<Hub> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Authenticator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.authenticator.clone()
    }
}
