//! Request and response bodies of the message REST surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::messaging::message::MessageType;
use crate::shared::messaging::reaction::ReactionSummary;

/// Default and maximum page sizes for history listing
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string of `GET /api/messages/{groupId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMessagesParams {
    #[serde(default)]
    pub take: Option<u32>,
    #[serde(default)]
    pub cursor: Option<Uuid>,
}

impl ListMessagesParams {
    /// Requested page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_size(&self) -> u32 {
        self.take.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    pub content: String,
    #[serde(default)]
    pub reply_to_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactRequest {
    pub emoji: String,
}

/// Upload kind selected by `?type=`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    #[default]
    Audio,
    Image,
    File,
}

impl UploadKind {
    /// Message type stored for an upload of this kind
    pub fn message_type(&self) -> MessageType {
        match self {
            UploadKind::Audio => MessageType::Audio,
            UploadKind::Image => MessageType::Image,
            UploadKind::File => MessageType::Sticker,
        }
    }
}

/// Query string of `POST /api/messages/{groupId}/upload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    #[serde(rename = "type", default)]
    pub kind: Option<UploadKind>,
    #[serde(default)]
    pub reply_to_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub message_id: Uuid,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub ok: bool,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkReadResponse {
    pub ok: bool,
    pub marked: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesParams {
    #[serde(default)]
    pub group_id: Option<Uuid>,
}

/// A favorited message, summarised for the favorites list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub message_id: Uuid,
    pub group_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub favorited_at: DateTime<Utc>,
}
