/**
 * API Route Handlers
 *
 * REST endpoints beside the hub connection:
 * - `GET /health` - Liveness probe
 * - `GET /api/hub/stats` - Connection and room counts
 * - `GET /api/chats/{chat_id}/history` - Stored messages of a chat,
 *   tombstones included (requires authentication)
 *
 * History is what a reconnecting client fetches to reconcile events it
 * missed while it was away.
 */

use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::hub::{Hub, HubStats};
use crate::backend::middleware::{auth_middleware, AuthUser};
use crate::backend::server::state::AppState;
use crate::shared::{ChatId, ChatMessage};

/// Configure API routes
///
/// `/api/chats/...` routes sit behind [`auth_middleware`]; the others are
/// public.
pub fn configure_api_routes(router: Router<AppState>, app_state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/chats/{chat_id}/history", get(get_history))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    router
        .route("/health", get(health))
        .route("/api/hub/stats", get(get_stats))
        .merge(protected)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_stats(State(hub): State<Arc<Hub>>) -> Json<HubStats> {
    Json(hub.stats().await)
}

async fn get_history(
    State(hub): State<Arc<Hub>>,
    AuthUser(identity): AuthUser,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Vec<ChatMessage>>, BackendError> {
    tracing::debug!("User {} fetching history of chat {}", identity.user_id, chat_id);
    Ok(Json(hub.history_for(&identity, chat_id).await?))
}
