//! Messaging Module
//!
//! The message core of the server.
//!
//! - **`store`** - `MessageStore` trait and its row/request types
//! - **`db`** - PostgreSQL implementation
//! - **`memory`** - in-process implementation for development and tests
//! - **`service`** - authorization, mentions, fan-out and push
//! - **`handlers`** / **`conversations`** - HTTP handlers

pub mod conversations;
pub mod db;
pub mod handlers;
pub mod memory;
pub mod service;
pub mod store;

pub use db::PgMessageStore;
pub use memory::MemoryMessageStore;
pub use service::MessageService;
pub use store::{MessageStore, NewMessage, NewUser, PageRequest, StoreError};
