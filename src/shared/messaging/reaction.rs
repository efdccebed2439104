//! Message reactions
//!
//! A user holds at most one reaction per message. The wire carries raw rows so
//! each client can compute `reacted_by_me` for itself; summaries are derived.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Longest emoji string accepted (grapheme clusters with modifiers run long)
pub const MAX_EMOJI_LEN: usize = 32;

/// One user's reaction on a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRow {
    pub user_id: Uuid,
    pub emoji: String,
}

/// Aggregated reactions for one emoji, relative to a viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: u32,
    pub reacted_by_me: bool,
}

/// Outcome of a reaction toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionToggle {
    Added,
    Removed,
    Replaced,
}

/// Decide what a toggle does given the user's current reaction
pub fn toggle_outcome(current: Option<&str>, requested: &str) -> ReactionToggle {
    match current {
        None => ReactionToggle::Added,
        Some(existing) if existing == requested => ReactionToggle::Removed,
        Some(_) => ReactionToggle::Replaced,
    }
}

/// Summaries ordered by count descending, then emoji ascending
pub fn summarize_reactions(rows: &[ReactionRow], viewer: Uuid) -> Vec<ReactionSummary> {
    let mut by_emoji: BTreeMap<&str, (u32, bool)> = BTreeMap::new();
    for row in rows {
        let entry = by_emoji.entry(row.emoji.as_str()).or_insert((0, false));
        entry.0 += 1;
        entry.1 |= row.user_id == viewer;
    }

    let mut summary: Vec<ReactionSummary> = by_emoji
        .into_iter()
        .map(|(emoji, (count, mine))| ReactionSummary {
            emoji: emoji.to_string(),
            count,
            reacted_by_me: mine,
        })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.emoji.cmp(&b.emoji)));
    summary
}

pub fn validate_emoji(emoji: &str) -> Result<(), SharedError> {
    let trimmed = emoji.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation("emoji", "must not be empty"));
    }
    if trimmed.len() > MAX_EMOJI_LEN {
        return Err(SharedError::validation("emoji", "too long"));
    }
    Ok(())
}
