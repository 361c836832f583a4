//! HTTP API layer for flux.
//!
//! A thin axum surface over the toggle engine:
//!
//! - **Endpoints**: post interactions and follow relationships
//! - **Extractors**: authenticated user, validated JSON bodies
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
