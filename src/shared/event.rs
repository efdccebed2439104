/**
 * Real-time Event System
 *
 * Frames exchanged over the realtime socket. Every frame is a JSON object
 * `{"event": <name>, "data": <payload>}`; the names are part of the wire
 * contract and are matched by the client library.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::messaging::{Message, ReactionRow};

/// Status reported for users that never set one
pub const DEFAULT_STATUS: &str = "online";
/// Status broadcast when a user's last session disconnects
pub const OFFLINE_STATUS: &str = "offline";

/// Payload of `message:deleted`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    pub id: Uuid,
    pub group_id: Uuid,
    pub deleted_at: DateTime<Utc>,
}

/// Payload of `messages:read`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagesRead {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub ids: Vec<Uuid>,
}

/// Payload of `message:reactions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsChanged {
    pub message_id: Uuid,
    pub group_id: Uuid,
    pub reactions: Vec<ReactionRow>,
}

/// One user's presence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: Uuid,
    pub status: String,
}

/// Payload of `presence:snapshot`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PresenceSnapshot {
    pub users: Vec<PresenceEntry>,
}

/// Events pushed from the server to connected sockets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(Message),
    #[serde(rename = "message:updated")]
    MessageUpdated(Message),
    #[serde(rename = "message:deleted")]
    MessageDeleted(MessageDeleted),
    #[serde(rename = "messages:read")]
    MessagesRead(MessagesRead),
    #[serde(rename = "message:reactions")]
    MessageReactions(ReactionsChanged),
    #[serde(rename = "presence:update")]
    PresenceUpdate(PresenceEntry),
    #[serde(rename = "presence:snapshot")]
    PresenceSnapshot(PresenceSnapshot),
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::MessageNew(_) => "message:new",
            ServerEvent::MessageUpdated(_) => "message:updated",
            ServerEvent::MessageDeleted(_) => "message:deleted",
            ServerEvent::MessagesRead(_) => "messages:read",
            ServerEvent::MessageReactions(_) => "message:reactions",
            ServerEvent::PresenceUpdate(_) => "presence:update",
            ServerEvent::PresenceSnapshot(_) => "presence:snapshot",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Group the event belongs to, for room-scoped events
    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            ServerEvent::MessageNew(m) | ServerEvent::MessageUpdated(m) => Some(m.group_id),
            ServerEvent::MessageDeleted(d) => Some(d.group_id),
            ServerEvent::MessagesRead(r) => Some(r.group_id),
            ServerEvent::MessageReactions(r) => Some(r.group_id),
            _ => None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error { message: message.into() }
    }
}

/// Frames sent by a client over the realtime socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "group:join")]
    JoinGroup(Uuid),
    #[serde(rename = "group:leave")]
    LeaveGroup(Uuid),
    /// Announce this connection as a live session of the authenticated user
    #[serde(rename = "presence:online")]
    PresenceOnline {
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(rename = "presence:set")]
    PresenceSet { status: String },
    #[serde(rename = "presence:who")]
    PresenceWho,
    #[serde(rename = "ping")]
    Ping,
}

/// Trim a client-supplied status; blank means `online`
pub fn normalize_status(status: Option<&str>) -> String {
    match status.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_STATUS.to_string(),
    }
}
