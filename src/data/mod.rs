//! Database access.

pub mod boots;
pub mod health;
