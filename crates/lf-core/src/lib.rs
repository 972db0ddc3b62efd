//! lf-core: shared types, IDs, errors, configuration, and audit events.
//!
//! This crate is the foundational dependency for all other lf-* crates,
//! providing type-safe identifiers, a unified error type, the annotation
//! data model, application configuration, and a broadcast event bus used as
//! the audit log.

pub mod annotation;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use annotation::*;
pub use error::{Error, Result};
pub use ids::*;
