//! Routes Module
//!
//! HTTP route configuration.
//!
//! - **`router`** - Main router creation, layers and fallback
//! - **`api_routes`** - REST endpoints behind bearer authentication

pub mod api_routes;
pub mod router;

pub use router::create_router;
