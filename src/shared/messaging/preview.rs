//! Sidebar / notification preview text

use uuid::Uuid;

use crate::shared::messaging::message::{Message, MessageType};

/// Prefix for the viewer's own messages
pub const OWN_PREFIX: &str = "You: ";

/// Body text for a message: text content, or a label for media types
pub fn body_text(kind: MessageType, content: &str) -> String {
    if kind.is_text() {
        content.to_string()
    } else {
        kind.label().to_string()
    }
}

/// Preview line as shown to `viewer`
pub fn preview_text(message: &Message, viewer: Uuid) -> String {
    let body = body_text(message.kind, &message.content);
    if message.author_id == viewer {
        format!("{}{}", OWN_PREFIX, body)
    } else {
        body
    }
}

/// Shorten a preview to at most `max_chars` characters
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
