//! Teamchat - Main Library
//!
//! Realtime message core of a team chat: group and direct conversations,
//! threaded replies, reactions, mentions, read receipts, favorites and
//! presence, served over REST and WebSocket.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between client and server
//!   - Message, reaction, group and event structures
//!   - Mention extraction and preview helpers
//!   - Error and configuration types
//!
//! - **`backend`** - Server-side code (only compiled with the `ssr` feature)
//!   - Axum HTTP + WebSocket server
//!   - PostgreSQL and in-memory message stores
//!   - Rooms, presence, push and upload storage
//!
//! - **`client`** - Client-side reconciliation
//!   - Typed REST client
//!   - Conversation store and sidebar aggregates
//!   - Local SQLite preferences
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - builds the server modules and binaries

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

/// Client-side conversation state
pub mod client;
