//! REST API integration tests

#[cfg(feature = "ssr")]
mod messages_test;
