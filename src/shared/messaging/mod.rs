//! Messaging Module
//!
//! Data structures of the team chat model shared by server and client:
//!
//! - `Message` - a message with its render-ready relations
//! - `ReactionRow` / `ReactionSummary` - per-user reactions and viewer summaries
//! - `Group`, `GroupSummary`, `DirectThread` - conversations and their counters
//! - mention extraction and preview helpers
//!
//! # Usage
//!
//! ```rust
//! use teamchat::shared::messaging::{Message, MessageType, summarize_reactions};
//! ```

pub mod api;
pub mod group;
pub mod mention;
pub mod message;
pub mod preview;
pub mod reaction;

pub use api::{
    CreateMessageRequest, DeleteResponse, EditMessageRequest, FavoriteEntry, FavoritesParams,
    ListMessagesParams, MarkReadResponse, OkResponse, ReactRequest, ReactionResponse, UploadKind,
    UploadParams, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use group::{
    sorted_pair, DirectThread, DirectThreadSummary, Group, GroupSummary, MemberName, MemberRole,
    User, DIRECT_GROUP_NAME,
};
pub use mention::extract_mentioned_user_ids;
pub use message::{validate_content, AuthorSummary, Message, MessageType, ReplyAuthor, ReplyPreview};
pub use preview::{body_text, preview_text};
pub use reaction::{summarize_reactions, ReactionRow, ReactionSummary, ReactionToggle};
