//! Shared Error Types
//!
//! Errors that both the server and the client library can produce while
//! handling the shared chat data model.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON encoding/decoding failures
//! - `ValidationError` - a field failed a data-model rule
//! - `UnknownMessageType` - a message type string outside the supported set
//!
//! # Usage
//!
//! ```rust
//! use teamchat::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "must not be empty");
//! assert!(error.to_string().contains("content"));
//! ```
use thiserror::Error;

/// Shared error types that can occur in both client and server code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Message type string that is not one of text/image/gif/audio/sticker
    #[error("Unknown message type: {kind}")]
    UnknownMessageType {
        /// The rejected type string
        kind: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_type(kind: impl Into<String>) -> Self {
        Self::UnknownMessageType { kind: kind.into() }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
