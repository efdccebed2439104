//! Client Conversation Store
//!
//! Holds one open conversation's messages in ascending `(createdAt, id)`
//! order, assembled from paginated backfill and live socket events. Message
//! identity is the id: inserting a known id is a no-op, so a REST response
//! and its socket echo can arrive in either order.
//!
//! Page requests are issued with a [`PageTicket`]. Starting a new request
//! supersedes every earlier ticket; late results for a superseded ticket are
//! discarded instead of being applied out of order.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::shared::event::MessagesRead;
use crate::shared::messaging::{summarize_reactions, Message};
use crate::shared::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// First page, no cursor
    Latest,
    /// Messages older than the oldest held one
    Older,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub group_id: Uuid,
    pub generation: u64,
    pub kind: PageKind,
    pub cursor: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    group_id: Uuid,
    viewer: Uuid,
    page_size: u32,
    messages: Vec<Message>,
    generation: u64,
    has_more: bool,
}

impl ConversationStore {
    pub fn new(group_id: Uuid, viewer: Uuid, page_size: u32) -> Self {
        Self {
            group_id,
            viewer,
            page_size: page_size.max(1),
            messages: Vec::new(),
            generation: 0,
            has_more: true,
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Messages in display order (oldest first)
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, message_id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn contains(&self, message_id: Uuid) -> bool {
        self.get(message_id).is_some()
    }

    /// False once a page came back shorter than the page size
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    fn next_ticket(&mut self, kind: PageKind, cursor: Option<Uuid>) -> PageTicket {
        self.generation += 1;
        PageTicket {
            group_id: self.group_id,
            generation: self.generation,
            kind,
            cursor,
        }
    }

    /// Ticket for (re)loading the newest page
    pub fn begin_reload(&mut self) -> PageTicket {
        self.next_ticket(PageKind::Latest, None)
    }

    /// Ticket for the page before the oldest held message, if any
    pub fn begin_load_older(&mut self) -> Option<PageTicket> {
        let cursor = self.messages.first()?.id;
        if !self.has_more {
            return None;
        }
        Some(self.next_ticket(PageKind::Older, Some(cursor)))
    }

    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        ticket.group_id == self.group_id && ticket.generation == self.generation
    }

    /// Apply a page (as returned by the server, newest first)
    ///
    /// Returns false when the ticket was superseded and the page ignored.
    pub fn apply_page(&mut self, ticket: &PageTicket, page: Vec<Message>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "[Conversation] Discarding stale page for {} (generation {} < {})",
                ticket.group_id,
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.has_more = page.len() as u32 >= self.page_size;

        match ticket.kind {
            PageKind::Latest => {
                // Keep live messages that arrived after the page's newest entry
                let newest = page.iter().map(Message::sort_key).max();
                let live: Vec<Message> = match newest {
                    Some(newest) => self
                        .messages
                        .drain(..)
                        .filter(|m| m.sort_key() > newest)
                        .collect(),
                    None => std::mem::take(&mut self.messages),
                };
                for message in page.into_iter().chain(live) {
                    self.insert_sorted(message);
                }
            }
            PageKind::Older => {
                for message in page {
                    self.insert_sorted(message);
                }
            }
        }
        true
    }

    fn insert_sorted(&mut self, message: Message) -> bool {
        if self.contains(message.id) {
            return false;
        }
        let key = message.sort_key();
        let position = self
            .messages
            .binary_search_by(|m| m.sort_key().cmp(&key).then(Ordering::Less))
            .unwrap_or_else(|p| p);
        self.messages.insert(position, message);
        true
    }

    /// Add a message unless its id is already held; replies bump the
    /// parent's reply count
    pub fn insert(&mut self, message: Message) -> bool {
        if message.group_id != self.group_id {
            return false;
        }
        let parent = message.reply_to_id;
        if !self.insert_sorted(message) {
            return false;
        }
        if let Some(parent) = parent.and_then(|id| self.messages.iter_mut().find(|m| m.id == id)) {
            parent.reply_count += 1;
        }
        true
    }

    fn apply_read(&mut self, read: &MessagesRead) -> bool {
        let mut changed = false;
        for message in self.messages.iter_mut().filter(|m| read.ids.contains(&m.id)) {
            if !message.read_by.contains(&read.user_id) {
                message.read_by.push(read.user_id);
                changed = true;
            }
        }
        changed
    }

    /// Merge a live event; returns true if the visible state changed
    pub fn apply_event(&mut self, event: &ServerEvent) -> bool {
        if event.group_id() != Some(self.group_id) {
            return false;
        }
        match event {
            ServerEvent::MessageNew(message) => self.insert(message.clone()),
            ServerEvent::MessageUpdated(updated) => match self.messages.iter_mut().find(|m| m.id == updated.id) {
                Some(slot) => {
                    *slot = updated.clone().with_summary_for(self.viewer);
                    true
                }
                None => false,
            },
            ServerEvent::MessageDeleted(deleted) => match self.messages.iter_mut().find(|m| m.id == deleted.id) {
                Some(slot) if slot.deleted_at.is_none() => {
                    slot.deleted_at = Some(deleted.deleted_at);
                    *slot = slot.clone().redacted();
                    true
                }
                _ => false,
            },
            ServerEvent::MessagesRead(read) => self.apply_read(read),
            ServerEvent::MessageReactions(changed) => {
                let viewer = self.viewer;
                match self.messages.iter_mut().find(|m| m.id == changed.message_id) {
                    Some(slot) => {
                        slot.reactions = changed.reactions.clone();
                        slot.reaction_summary = summarize_reactions(&slot.reactions, viewer);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}
