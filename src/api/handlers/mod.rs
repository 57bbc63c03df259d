//! API handlers for confgate.

pub mod auth;
pub mod health;
