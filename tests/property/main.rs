//! Property-based tests

#[cfg(feature = "ssr")]
mod store_proptest;
