//! Sidebar Aggregates
//!
//! Per-conversation last activity, preview line and unread counter for every
//! conversation the user belongs to, kept current from live messages without
//! a server round-trip.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::local_db::ConversationPrefs;
use crate::shared::messaging::{preview_text, DirectThreadSummary, GroupSummary, Message};

/// Unread count shown to the user: a manual flag forces at least 1
pub fn effective_unread(server_unread: u32, manually_unread: bool) -> u32 {
    server_unread.max(u32::from(manually_unread))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub group_id: Uuid,
    pub title: String,
    pub is_direct: bool,
    pub last_activity: Option<DateTime<Utc>>,
    pub preview: Option<String>,
    pub unread: u32,
    pub mentions: u32,
}

/// What the caller should do after an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The conversation is open: mark it read on the server
    MarkRead,
    /// Counted as unread
    Unread,
    /// Authored by the viewer
    Own,
    /// Not a conversation the sidebar knows
    Unknown,
    /// Already counted; a repeated delivery of the same message
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct Sidebar {
    viewer: Uuid,
    entries: HashMap<Uuid, ConversationEntry>,
    /// Live message ids already applied, per conversation
    seen: HashMap<Uuid, HashSet<Uuid>>,
    active: Option<Uuid>,
}

impl Sidebar {
    pub fn new(viewer: Uuid) -> Self {
        Self {
            viewer,
            entries: HashMap::new(),
            seen: HashMap::new(),
            active: None,
        }
    }

    pub fn load_groups(&mut self, groups: &[GroupSummary]) {
        for group in groups {
            self.upsert(ConversationEntry {
                group_id: group.id,
                title: group.name.clone(),
                is_direct: false,
                last_activity: group.last_message_at,
                preview: None,
                unread: group.unread,
                mentions: group.mentions,
            });
        }
    }

    pub fn load_direct_threads(&mut self, threads: &[DirectThreadSummary]) {
        for thread in threads {
            self.upsert(ConversationEntry {
                group_id: thread.group_id,
                title: thread.other.name.clone(),
                is_direct: true,
                last_activity: thread.last_message_at,
                preview: thread.last_message.as_ref().map(|m| preview_text(m, self.viewer)),
                unread: thread.unread,
                mentions: 0,
            });
        }
    }

    pub fn upsert(&mut self, mut entry: ConversationEntry) {
        if self.active == Some(entry.group_id) {
            entry.unread = 0;
        }
        self.entries.insert(entry.group_id, entry);
    }

    pub fn get(&self, group_id: Uuid) -> Option<&ConversationEntry> {
        self.entries.get(&group_id)
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    /// Make `group_id` the open conversation and clear its counters
    pub fn open(&mut self, group_id: Uuid) {
        self.active = Some(group_id);
        if let Some(entry) = self.entries.get_mut(&group_id) {
            entry.unread = 0;
            entry.mentions = 0;
        }
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    /// Update aggregates for a live message
    pub fn on_message(&mut self, message: &Message) -> InboundOutcome {
        let is_active = self.active == Some(message.group_id);
        let Some(entry) = self.entries.get_mut(&message.group_id) else {
            return InboundOutcome::Unknown;
        };
        if !self.seen.entry(message.group_id).or_default().insert(message.id) {
            return InboundOutcome::Duplicate;
        }

        if entry.last_activity.map_or(true, |current| current <= message.created_at) {
            entry.last_activity = Some(message.created_at);
            entry.preview = Some(preview_text(message, self.viewer));
        }

        if message.author_id == self.viewer {
            InboundOutcome::Own
        } else if is_active {
            entry.unread = 0;
            InboundOutcome::MarkRead
        } else {
            entry.unread += 1;
            InboundOutcome::Unread
        }
    }

    /// Entries in display order: pinned first, then last activity (newest
    /// first), unread count, title
    pub fn ordered(&self, prefs: &ConversationPrefs) -> Vec<&ConversationEntry> {
        let mut entries: Vec<&ConversationEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            prefs
                .is_pinned(b.group_id)
                .cmp(&prefs.is_pinned(a.group_id))
                .then_with(|| b.last_activity.cmp(&a.last_activity))
                .then_with(|| b.unread.cmp(&a.unread))
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                .then_with(|| a.group_id.cmp(&b.group_id))
        });
        entries
    }

    pub fn effective_unread(&self, group_id: Uuid, prefs: &ConversationPrefs) -> u32 {
        let server = self.entries.get(&group_id).map_or(0, |e| e.unread);
        effective_unread(server, prefs.is_manually_unread(group_id))
    }
}
