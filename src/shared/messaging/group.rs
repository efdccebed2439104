//! Groups, membership and direct threads
//!
//! Every conversation is a group; a direct message thread is a private group
//! with exactly two members plus a `DirectThread` row keyed by the sorted pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::messaging::message::{AuthorSummary, Message};

/// Name given to the group backing a direct thread
pub const DIRECT_GROUP_NAME: &str = "DM";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub is_private: bool,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Member,
    Admin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value == "admin" {
            MemberRole::Admin
        } else {
            MemberRole::Member
        }
    }
}

/// Member id plus display name, the input to mention matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberName {
    pub user_id: Uuid,
    pub name: String,
}

/// A group as listed for one user, with that user's counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub is_private: bool,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Non-deleted messages by others without a read receipt
    pub unread: u32,
    /// Unread messages that mention the user
    pub mentions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectThread {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DirectThread {
    pub fn other_participant(&self, me: Uuid) -> Uuid {
        if self.user_a_id == me {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }
}

/// A direct thread as listed for one participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectThreadSummary {
    pub id: Uuid,
    pub group_id: Uuid,
    pub other: AuthorSummary,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread: u32,
}

/// Canonical (smaller, larger) ordering for a direct thread pair
pub fn sorted_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
