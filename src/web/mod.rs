//! HTTP surface: health, readiness, and status endpoints.

pub mod health;
pub mod middleware;
pub mod routes;

pub use routes::*;
