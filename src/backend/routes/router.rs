/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Hub connection (`/hubs/message`)
 * 2. API routes (health, stats, history)
 * 3. Fallback handler (404)
 */

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::realtime::websocket::hub_socket;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Path clients open their hub connection on
pub const HUB_PATH: &str = "/hubs/message";

/// Create the Axum router with all routes configured
///
/// # Route Details
///
/// - `GET /hubs/message` - WebSocket upgrade into a hub session
/// - `GET /health` - Liveness probe
/// - `GET /api/hub/stats` - Hub counters
/// - `GET /api/chats/{chat_id}/history` - Chat history (authenticated)
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route(HUB_PATH, get(hub_socket));

    // Add API routes
    let router = configure_api_routes(router, &app_state);

    // Fallback handler for 404
    let router = router.fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") });

    router.layer(TraceLayer::new_for_http()).with_state(app_state)
}
