//! Client error type

use thiserror::Error;

use crate::shared::ConfigError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("no conversation is open")]
    NoConversation,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an error status; `message` is its error text
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("local database error: {0}")]
    LocalDb(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
