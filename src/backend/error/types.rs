/**
 * Backend Error Types
 *
 * Errors produced while serving the REST and realtime surfaces. Each variant
 * maps to one HTTP status so handlers can return `Result<_, BackendError>`
 * and let `IntoResponse` render the JSON body.
 *
 * # Status Mapping
 *
 * - `Validation` - 400, bad input rejected before any mutation
 * - `Unauthenticated` - 401, missing or invalid bearer token
 * - `NotMember` / `Forbidden` - 403, membership or authorship checks
 * - `NotFound` - 404, unknown message, group, user or cursor
 * - `Upstream` - 502, storage driver or other collaborator failure
 * - `Store` - 500 unless the store reports a missing row
 */

use thiserror::Error;
use axum::http::StatusCode;

use crate::backend::messaging::store::StoreError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use teamchat::backend::error::BackendError;
///
/// let err = BackendError::validation("content must not be empty");
/// assert_eq!(err.status_code().as_u16(), 400);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request body, path or query failed validation
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
    },

    /// Missing, malformed or expired credentials
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        message: String,
    },

    /// The caller is not a member of the target group
    #[error("Not a member of this group")]
    NotMember,

    /// The caller is a member but lacks the right for this operation
    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
    },

    /// The addressed entity does not exist
    #[error("{what} not found")]
    NotFound {
        what: &'static str,
    },

    /// A collaborator (storage driver, webhook) failed
    #[error("Upstream failure: {message}")]
    Upstream {
        message: String,
    },

    /// Persistence layer error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Shared error (validation and serialization rules of the data model)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { message: message.into() }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::NotMember | Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Deleted) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::UnknownMessageType { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message rendered to the client. Internal failures are not echoed.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::Unauthenticated { message }
            | Self::Forbidden { message }
            | Self::Upstream { message } => message.clone(),
            Self::NotMember => "not a member of this group".to_string(),
            Self::NotFound { what } => format!("{} not found", what),
            Self::Store(StoreError::NotFound(what)) => format!("{} not found", what),
            Self::Store(StoreError::Deleted) => "message was deleted".to_string(),
            Self::Store(_) | Self::SerializationError(_) => "internal server error".to_string(),
            Self::SharedError(err) => err.to_string(),
        }
    }
}
