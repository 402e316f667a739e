//! service-core: Shared infrastructure for Stratum services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
