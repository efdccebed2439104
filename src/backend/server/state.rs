/**
 * Application State Management
 *
 * `AppState` is the central state container shared by every handler. The
 * `FromRef` implementations let handlers extract just the part they need,
 * following Axum's recommended pattern.
 *
 * # Thread Safety
 *
 * Everything inside is cheap to clone and safe to share: the store and the
 * collaborators sit behind `Arc`, and `RoomBroker`/`PresenceTracker` wrap
 * their maps in `Arc<Mutex<..>>`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::messaging::{MessageService, MessageStore};
use crate::backend::push::PushDispatcher;
use crate::backend::realtime::{PresenceTracker, RoomBroker};
use crate::backend::server::config::ServerConfig;
use crate::backend::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn MessageStore>,
    pub rooms: RoomBroker,
    pub presence: PresenceTracker,
    pub messages: MessageService,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn MessageStore>,
        push: Arc<dyn PushDispatcher>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let rooms = RoomBroker::new();
        let messages = MessageService::new(store.clone(), rooms.clone(), push, storage);
        Self {
            config: Arc::new(config),
            store,
            rooms,
            presence: PresenceTracker::new(),
            messages,
        }
    }
}

impl FromRef<AppState> for MessageService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.messages.clone()
    }
}

impl FromRef<AppState> for RoomBroker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rooms.clone()
    }
}

impl FromRef<AppState> for PresenceTracker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}
