//! Chat Message Data Structure
//!
//! A message as it travels between server and clients: the persisted row plus
//! the relations every consumer needs to render it (author, one-level reply
//! preview, reaction rows, readers and reply count).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::messaging::reaction::{summarize_reactions, ReactionRow, ReactionSummary};

/// Type of message content
///
/// `Sticker` doubles as the generic "file attachment" type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Gif,
    Audio,
    Sticker,
}

impl MessageType {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Gif => "gif",
            MessageType::Audio => "audio",
            MessageType::Sticker => "sticker",
        }
    }

    /// Short label used in previews and push bodies for non-text messages
    pub fn label(&self) -> &'static str {
        match self {
            MessageType::Image | MessageType::Gif => "Image",
            MessageType::Audio => "Audio",
            MessageType::Text | MessageType::Sticker => "Attachment",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MessageType::Text)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "gif" => Ok(MessageType::Gif),
            "audio" => Ok(MessageType::Audio),
            "sticker" => Ok(MessageType::Sticker),
            other => Err(SharedError::unknown_type(other)),
        }
    }
}

/// Author fields embedded in every message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Author of a replied-to message (name only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyAuthor {
    pub id: Uuid,
    pub name: String,
}

/// One-level preview of the message being replied to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyPreview {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub author: ReplyAuthor,
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub author: AuthorSummary,
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Text, or a URL (with a `name` query parameter) for uploads
    pub content: String,
    #[serde(default)]
    pub reply_to_id: Option<Uuid>,
    #[serde(default)]
    pub reply_to: Option<ReplyPreview>,
    #[serde(default)]
    pub reply_count: u32,
    /// Raw per-user reaction rows
    #[serde(default)]
    pub reactions: Vec<ReactionRow>,
    /// Summary computed for the requesting viewer; empty on broadcasts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reaction_summary: Vec<ReactionSummary>,
    /// Ids of users holding a read receipt for this message
    #[serde(default)]
    pub read_by: Vec<Uuid>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_read_by(&self, user_id: Uuid) -> bool {
        self.read_by.contains(&user_id)
    }

    /// Reaction summary as seen by `viewer`
    pub fn summary_for(&self, viewer: Uuid) -> Vec<ReactionSummary> {
        summarize_reactions(&self.reactions, viewer)
    }

    /// Fill `reaction_summary` for the given viewer
    pub fn with_summary_for(mut self, viewer: Uuid) -> Self {
        self.reaction_summary = self.summary_for(viewer);
        self
    }

    /// Blank out the body of a tombstoned message (and of a tombstoned reply
    /// target) before it leaves the server. Storage keeps the original text.
    pub fn redacted(mut self) -> Self {
        if self.is_deleted() {
            self.content.clear();
            self.reactions.clear();
            self.reaction_summary.clear();
        }
        self
    }

    /// Ordering key used for pagination and client-side placement
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

/// Validate a client-supplied message body
pub fn validate_content(content: &str) -> Result<(), SharedError> {
    if content.is_empty() {
        return Err(SharedError::validation("content", "must contain at least 1 character"));
    }
    Ok(())
}
