//! App fixtures
//!
//! `TestApp` runs the real router in-process on top of a memory store, with
//! uploads going to a temporary directory. Tests seed users and groups
//! through the store directly and talk HTTP through `axum_test::TestServer`.

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use tempfile::TempDir;
use tokio::sync::broadcast;
use uuid::Uuid;

use teamchat::backend::auth::create_token;
use teamchat::backend::messaging::{MemoryMessageStore, MessageStore, NewUser};
use teamchat::backend::push::LoggingPushDispatcher;
use teamchat::backend::routes::create_router;
use teamchat::backend::server::{AppState, ServerConfig};
use teamchat::backend::storage::LocalDiskStorage;
use teamchat::shared::messaging::MemberRole;
use teamchat::shared::ServerEvent;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A seeded user with a valid token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub token: String,
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryMessageStore>,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads = TempDir::new().expect("temp upload dir");
        let config = ServerConfig {
            jwt_secret: TEST_SECRET.to_string(),
            upload_dir: uploads.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let store = Arc::new(MemoryMessageStore::new());
        let storage = Arc::new(LocalDiskStorage::new(uploads.path(), None));
        let state = AppState::new(config, store.clone(), Arc::new(LoggingPushDispatcher), storage);
        let server = TestServer::new(create_router(state.clone())).expect("test server");
        Self {
            server,
            state,
            store,
            uploads,
        }
    }

    async fn create_user(&self, name: &str, is_admin: bool) -> TestUser {
        let email = format!("{}-{}@test.local", name.to_lowercase().replace(' ', "."), Uuid::new_v4().simple());
        let mut new_user = NewUser::new(email, name);
        new_user.is_admin = is_admin;
        let user = self.store.create_user(new_user).await.expect("create user");
        TestUser {
            id: user.id,
            name: user.name,
            token: create_token(TEST_SECRET, user.id, is_admin).expect("token"),
        }
    }

    pub async fn user(&self, name: &str) -> TestUser {
        self.create_user(name, false).await
    }

    pub async fn admin(&self, name: &str) -> TestUser {
        self.create_user(name, true).await
    }

    /// A room with the given members
    pub async fn group(&self, name: &str, members: &[&TestUser]) -> Uuid {
        let group = self.store.create_group(name, false).await.expect("create group");
        for member in members {
            self.store
                .add_member(group.id, member.id, MemberRole::Member)
                .await
                .expect("add member");
        }
        group.id
    }

    pub fn subscribe(&self, group_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.state.rooms.subscribe(group_id)
    }
}

/// Next event on a room, failing after one second
pub async fn next_event(receiver: &mut broadcast::Receiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("timed out waiting for event")
        .expect("room closed")
}
