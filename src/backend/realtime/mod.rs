//! Real-time Module
//!
//! Socket transport for the chat: per-group rooms, presence, and the
//! WebSocket endpoint that ties them to a connection.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs       - Module exports and documentation
//! ├── broadcast.rs - Per-group broadcast channels (RoomBroker)
//! ├── presence.rs  - Reference-counted online state
//! └── socket.rs    - `/ws` upgrade handler and per-connection session
//! ```
//!
//! # Events
//!
//! Room events (`message:new`, `message:updated`, `message:deleted`,
//! `messages:read`, `message:reactions`) reach only sockets joined to that
//! group. Presence events reach every connected socket.

/// Per-group event broadcasting
pub mod broadcast;

/// Online state tracking
pub mod presence;

/// WebSocket endpoint
pub mod socket;

pub use broadcast::{broadcast_event, RealtimeEventBroadcast, RoomBroker};
pub use presence::PresenceTracker;
pub use socket::{socket_handler, SocketSession};
