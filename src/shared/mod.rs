//! Shared Module
//!
//! Types shared between the server and the client library: the chat data
//! model, the realtime event frames, shared errors and client configuration.
//! Everything here is plain data and compiles without the `ssr` feature.

/// Chat data model
pub mod messaging;

/// Realtime event frames
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{ClientEvent, ServerEvent};
