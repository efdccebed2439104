/**
 * Server Initialization
 *
 * Builds the application state from `ServerConfig` (store, push dispatcher,
 * upload storage), creates the router, and starts background maintenance.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::backend::push::{LoggingPushDispatcher, PushDispatcher, WebhookPushDispatcher};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_store, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::storage::LocalDiskStorage;

const ROOM_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
pub async fn create_app(config: ServerConfig) -> Router<()> {
    tracing::info!("Initializing teamchat server");

    let store = load_store(&config).await;

    let push: Arc<dyn PushDispatcher> = match config.push_webhook_url.as_deref() {
        Some(url) => {
            tracing::info!("Push notifications go to {}", url);
            Arc::new(WebhookPushDispatcher::new(url))
        }
        None => {
            tracing::info!("PUSH_WEBHOOK_URL not set, push notifications are only logged");
            Arc::new(LoggingPushDispatcher)
        }
    };
    let storage = Arc::new(LocalDiskStorage::new(
        config.upload_dir.clone(),
        config.public_base_url.clone(),
    ));

    let app_state = AppState::new(config, store, push, storage);
    let app = create_router(app_state.clone());

    let rooms = app_state.rooms.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ROOM_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = rooms.cleanup_inactive_rooms();
            tracing::debug!("Cleaned up {} inactive rooms", removed);
        }
    });

    tracing::info!("Router configured with periodic cleanup task");
    app
}
