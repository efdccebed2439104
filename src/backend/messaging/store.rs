//! Persistence contract for the message core
//!
//! `MessageStore` is the seam between the message service and its backing
//! database. `PgMessageStore` (PostgreSQL) is used in production; the
//! in-process `MemoryMessageStore` backs tests and servers started without
//! `DATABASE_URL`. Every mutating operation is atomic on its own.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::messaging::{
    DirectThread, DirectThreadSummary, FavoriteEntry, Group, GroupSummary, MemberName, MemberRole,
    Message, MessageType, ReactionRow, User,
};

/// Errors raised by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("message was deleted")]
    Deleted,

    #[error("invalid stored value: {0}")]
    InvalidData(String),
}

/// A user to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: bool,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            avatar_url: None,
            password_hash: None,
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// A message to insert
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub kind: MessageType,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
}

/// Keyset page request: up to `take` messages strictly older than `cursor`
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub take: u32,
    pub cursor: Option<Uuid>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    // -- users and membership --

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_group(&self, name: &str, is_private: bool) -> Result<Group, StoreError>;

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: MemberRole) -> Result<(), StoreError>;

    /// Role of `user_id` in `group_id`, `None` for non-members
    async fn member_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<MemberRole>, StoreError>;

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.member_role(group_id, user_id).await?.is_some())
    }

    async fn member_names(&self, group_id: Uuid) -> Result<Vec<MemberName>, StoreError>;

    /// Non-direct groups of a user with unread and mention counters
    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<GroupSummary>, StoreError>;

    async fn find_direct_thread(&self, a: Uuid, b: Uuid) -> Result<Option<DirectThread>, StoreError>;

    /// Existing thread for the unordered pair, or a freshly created one
    async fn open_direct_thread(&self, a: Uuid, b: Uuid) -> Result<DirectThread, StoreError>;

    async fn direct_threads_for_user(&self, user_id: Uuid) -> Result<Vec<DirectThreadSummary>, StoreError>;

    // -- messages --

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Newest-first page; `NotFound` when the cursor is not a message of the group
    async fn list_messages(&self, group_id: Uuid, page: PageRequest) -> Result<Vec<Message>, StoreError>;

    /// Insert the message and its mentions and bump the group's last activity,
    /// returning the stored message with relations.
    async fn insert_message(&self, message: NewMessage, mentions: &[Uuid]) -> Result<Message, StoreError>;

    /// Replace content, stamp `edited_at`, replace mentions. A tombstoned
    /// message is left untouched and yields `StoreError::Deleted`.
    async fn update_message(&self, message_id: Uuid, content: &str, mentions: &[Uuid]) -> Result<Message, StoreError>;

    /// Stamp `deleted_at` unless already set.
    async fn soft_delete_message(&self, message_id: Uuid) -> Result<Message, StoreError>;

    /// Upsert-toggle the user's reaction and return the message's reaction rows.
    /// Fails with `StoreError::Deleted` on a tombstone.
    async fn toggle_reaction(&self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<Vec<ReactionRow>, StoreError>;

    async fn add_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn remove_favorite(&self, message_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn list_favorites(&self, user_id: Uuid, group_id: Option<Uuid>) -> Result<Vec<FavoriteEntry>, StoreError>;

    /// Record reads for every message of the group authored by someone else and
    /// return the ids that were newly marked.
    async fn mark_group_read(&self, group_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
}
