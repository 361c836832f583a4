//! Toggle engine and services for flux.

pub mod services;

pub use services::*;
