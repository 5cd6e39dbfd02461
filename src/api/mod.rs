//! API layer
//!
//! HTTP surface over the core engines.

pub mod routes;

pub use routes::{create_router, AppState};
