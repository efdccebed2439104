//! Socket session tests

#[cfg(feature = "ssr")]
mod rooms_test;
