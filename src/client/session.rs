//! Chat Session
//!
//! Wires the API client, the open conversation, the sidebar and the local
//! preferences together. A UI drives it with user actions (`open_conversation`,
//! `load_older`, `send_text`) and forwards every socket event to
//! `handle_event`.
//!
//! Failed requests are returned to the caller with the server's error text
//! and are never retried automatically.

use uuid::Uuid;

use super::api::ApiClient;
use super::conversation::ConversationStore;
use super::error::ClientError;
use super::local_db::LocalPrefs;
use super::sidebar::{ConversationEntry, InboundOutcome, Sidebar};
use crate::shared::messaging::{CreateMessageRequest, Message, MessageType};
use crate::shared::ServerEvent;

/// One sidebar row as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarRow {
    pub entry: ConversationEntry,
    pub unread: u32,
    pub pinned: bool,
    pub muted: bool,
}

pub struct ChatSession {
    api: ApiClient,
    viewer: Uuid,
    sidebar: Sidebar,
    prefs: LocalPrefs,
    open: Option<ConversationStore>,
}

impl ChatSession {
    pub fn new(api: ApiClient, viewer: Uuid, prefs: LocalPrefs) -> Self {
        Self {
            api,
            viewer,
            sidebar: Sidebar::new(viewer),
            prefs,
            open: None,
        }
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn conversation(&self) -> Option<&ConversationStore> {
        self.open.as_ref()
    }

    /// Groups and direct threads from the server
    pub async fn refresh_sidebar(&mut self) -> Result<(), ClientError> {
        let groups = self.api.groups().await?;
        let threads = self.api.direct_threads().await?;
        self.sidebar.load_groups(&groups);
        self.sidebar.load_direct_threads(&threads);
        Ok(())
    }

    /// Ordered sidebar with effective unread counts
    pub async fn sidebar_rows(&self) -> Result<Vec<SidebarRow>, ClientError> {
        let prefs = self.prefs.load().await?;
        Ok(self
            .sidebar
            .ordered(&prefs)
            .into_iter()
            .map(|entry| SidebarRow {
                unread: self.sidebar.effective_unread(entry.group_id, &prefs),
                pinned: prefs.is_pinned(entry.group_id),
                muted: prefs.is_muted(entry.group_id),
                entry: entry.clone(),
            })
            .collect())
    }

    /// Open a conversation: fetch its newest page and mark it read
    pub async fn open_conversation(&mut self, group_id: Uuid) -> Result<(), ClientError> {
        self.sidebar.open(group_id);
        self.prefs.set_manual_unread(group_id, false).await?;

        let page_size = self.api.config().page_size();
        let mut store = ConversationStore::new(group_id, self.viewer, page_size);
        let ticket = store.begin_reload();
        self.open = Some(store);

        let page = self.api.list_messages(group_id, Some(page_size), None).await?;
        if let Some(store) = self.open.as_mut() {
            store.apply_page(&ticket, page);
        }

        self.api.mark_read(group_id).await?;
        Ok(())
    }

    pub fn close_conversation(&mut self) {
        self.open = None;
        self.sidebar.close();
    }

    /// Prepend the page before the oldest loaded message; returns how many
    /// messages were added
    pub async fn load_older(&mut self) -> Result<usize, ClientError> {
        let Some(store) = self.open.as_mut() else {
            return Ok(0);
        };
        let Some(ticket) = store.begin_load_older() else {
            return Ok(0);
        };
        let before = store.messages().len();
        let page_size = store.page_size();

        let page = self
            .api
            .list_messages(ticket.group_id, Some(page_size), ticket.cursor)
            .await?;

        match self.open.as_mut() {
            Some(store) => {
                if store.apply_page(&ticket, page) {
                    Ok(store.messages().len().saturating_sub(before))
                } else {
                    Ok(0)
                }
            }
            None => Ok(0),
        }
    }

    /// Send a text message and echo the response locally
    pub async fn send_text(&mut self, content: &str, reply_to_id: Option<Uuid>) -> Result<Message, ClientError> {
        let group_id = self
            .open
            .as_ref()
            .map(ConversationStore::group_id)
            .ok_or(ClientError::NoConversation)?;

        let request = CreateMessageRequest {
            kind: MessageType::Text,
            content: content.to_string(),
            reply_to_id,
        };
        let message = self.api.send_message(group_id, &request).await?;

        if let Some(store) = self.open.as_mut() {
            store.insert(message.clone());
        }
        self.sidebar.on_message(&message);
        Ok(message)
    }

    /// Flag a conversation unread locally
    pub async fn mark_unread(&mut self, group_id: Uuid) -> Result<(), ClientError> {
        self.prefs.set_manual_unread(group_id, true).await?;
        Ok(())
    }

    pub async fn set_pinned(&mut self, group_id: Uuid, pinned: bool) -> Result<(), ClientError> {
        self.prefs.set_pinned(group_id, pinned).await?;
        Ok(())
    }

    /// Merge a socket event into the sidebar and the open conversation
    pub async fn handle_event(&mut self, event: &ServerEvent) -> Result<(), ClientError> {
        let applied = match self.open.as_mut() {
            Some(store) => store.apply_event(event),
            None => false,
        };

        match event {
            ServerEvent::MessageNew(message) => {
                let open_here = self.open.as_ref().map(ConversationStore::group_id) == Some(message.group_id);
                if open_here && !applied {
                    // repeated delivery of a message the conversation already holds
                    return Ok(());
                }
                if self.sidebar.on_message(message) == InboundOutcome::MarkRead {
                    self.api.mark_read(message.group_id).await?;
                }
            }
            ServerEvent::Error { message } => {
                tracing::warn!("[Session] Server reported: {}", message);
            }
            _ => {}
        }
        Ok(())
    }
}
