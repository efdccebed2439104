//! Client Module
//!
//! Client-side reconciliation of conversation state: a typed REST client,
//! the per-conversation message store, sidebar aggregates, local
//! preferences, and a session driver that ties them together.

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod local_db;
pub mod session;
pub mod sidebar;

pub use api::ApiClient;
pub use config::Config;
pub use conversation::{ConversationStore, PageKind, PageTicket};
pub use error::ClientError;
pub use local_db::{ConversationPrefs, LocalPrefs};
pub use session::{ChatSession, SidebarRow};
pub use sidebar::{effective_unread, ConversationEntry, InboundOutcome, Sidebar};
