//! Common test utilities and helpers
//!
//! - In-process app fixtures backed by the memory store
//! - Token helpers
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use fixtures::*;
