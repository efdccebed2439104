//! Integration tests
//!
//! The REST surface and socket sessions run in-process against the memory
//! store; the client session talks to a mocked server.

#[cfg(feature = "ssr")]
#[path = "../common/mod.rs"]
mod common;

mod api;
mod client;
mod realtime;
