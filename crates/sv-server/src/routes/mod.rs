//! Route handlers for the HTTP API.

pub mod admin;
pub mod assemble;
pub mod health;
pub mod metrics;
