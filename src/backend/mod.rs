//! Backend Module
//!
//! Server side of the team chat: an Axum HTTP + WebSocket server around the
//! message core. Only compiled with the `ssr` feature.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, app creation
//! - **`routes`** - Route configuration and router assembly
//! - **`messaging`** - Message store, service and HTTP handlers
//! - **`realtime`** - Rooms, presence and the socket endpoint
//! - **`auth`** - JWT issuing and verification
//! - **`middleware`** - Bearer authentication
//! - **`push`** - Push notification dispatch
//! - **`storage`** - Upload storage
//! - **`error`** - Backend error type and HTTP rendering
//!
//! # Request Flow
//!
//! A mutating request passes the auth middleware, reaches a handler in
//! `messaging::handlers`, and is delegated to `MessageService`, which checks
//! membership, writes through the `MessageStore`, then emits the matching
//! event to the group's room and schedules push notifications.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Message core
pub mod messaging;

/// Real-time rooms and presence
pub mod realtime;

/// Backend error types
pub mod error;

/// Token issuing and verification
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Push notifications
pub mod push;

/// Upload storage
pub mod storage;

pub use error::BackendError;
pub use server::{create_app, AppState, ServerConfig};
