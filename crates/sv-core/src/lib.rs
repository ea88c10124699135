//! sv-core: shared error taxonomy, configuration, request model, and IDs.
//!
//! This crate is the foundational dependency for all other sv-* crates. It
//! owns the fixed set of failure kinds every assembly job can end in, the
//! JSON application configuration, and the validated in-memory form of an
//! assembly request.

pub mod config;
pub mod error;
pub mod ids;
pub mod request;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, ErrorKind, Result};
pub use ids::JobId;
pub use request::{AssemblyRequest, Resolution, SceneSpec};
