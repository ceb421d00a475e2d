/**
 * Server Initialization
 *
 * This module wires the collaborators into a hub and builds the Axum
 * application around it.
 *
 * # Initialization Process
 *
 * 1. Open the message store (SQLite when `DATABASE_URL` is set, otherwise
 *    in memory)
 * 2. Choose the chat directory (REST, then SQLite, then in memory)
 * 3. Build the hub with a JWT authenticator
 * 4. Create the router with the hub in `AppState`
 */

use axum::Router;
use std::sync::Arc;

use crate::backend::auth::JwtAuthenticator;
use crate::backend::error::BackendError;
use crate::backend::hub::Hub;
use crate::backend::persistence::{
    ChatDirectory, HttpChatDirectory, InMemoryChatDirectory, InMemoryMessageStore, MessageStore,
    SqliteStore,
};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;
use crate::shared::HubError;

/// Build the hub described by `config`
pub async fn build_hub(config: &ServerConfig) -> Result<Arc<Hub>, BackendError> {
    let sqlite = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = SqliteStore::connect(url).await.map_err(HubError::from)?;
            tracing::info!("Database ready");
            Some(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set. Messages are kept in memory only.");
            None
        }
    };

    let store: Arc<dyn MessageStore> = match &sqlite {
        Some(store) => store.clone(),
        None => Arc::new(InMemoryMessageStore::new()),
    };

    let directory: Arc<dyn ChatDirectory> = match (&config.chat_directory_url, &sqlite) {
        (Some(url), _) => {
            tracing::info!("Chat membership is checked against {}", url);
            let mut directory = HttpChatDirectory::new(url.as_str())?;
            if let Some(token) = &config.chat_directory_token {
                directory = directory.with_service_token(token.as_str());
            }
            Arc::new(directory)
        }
        (None, Some(store)) => store.clone(),
        (None, None) => {
            tracing::warn!("No chat directory configured. Every membership check fails.");
            Arc::new(InMemoryChatDirectory::new())
        }
    };

    let authenticator = Arc::new(JwtAuthenticator::new(&config.jwt_secret));
    Ok(Arc::new(Hub::new(
        config.hub.clone(),
        authenticator,
        store,
        directory,
    )))
}

/// Create and configure the Axum application
///
/// Returns the router together with the hub so the caller can shut the hub
/// down when the server stops.
pub async fn create_app(config: &ServerConfig) -> Result<(Router<()>, Arc<Hub>), BackendError> {
    tracing::info!("Initializing chat hub server");

    let hub = build_hub(config).await?;
    let app = create_router(AppState::new(hub.clone()));

    tracing::info!("Router configured");
    Ok((app, hub))
}
