//! HTTP route handlers.

pub mod health;
pub mod highlighting;
pub mod metrics;
pub mod notes;
pub mod parcels;
