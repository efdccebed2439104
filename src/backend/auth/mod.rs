//! Authentication Module
//!
//! Token issuing and verification. Every HTTP route under `/api` and the
//! socket endpoint require a valid bearer token; the middleware in
//! [`crate::backend::middleware`] turns a verified token into an
//! [`AuthenticatedUser`](crate::backend::middleware::AuthenticatedUser).

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{create_token, verify_token, Claims};
