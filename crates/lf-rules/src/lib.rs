//! # lf-rules
//!
//! Filter expressions deciding which annotation objects an action chain
//! sees on each frame.
//!
//! - [`Condition`] -- leaf conditions that test a single object property.
//! - [`Expr`] -- expression tree combining conditions with AND/OR/NOT.
//! - [`matches_all`] -- applies a filter list the way the pipeline does.

pub mod condition;
pub mod expr;

pub use condition::Condition;
pub use expr::{evaluate, matches_all, Expr};

/// Parse a filter list from JSON.
///
/// Accepts either a single expression object or an array of expressions.
/// Keeps serde monomorphization for the recursive [`Expr`] inside this
/// crate.
pub fn parse_filters(json: &str) -> Result<Vec<Expr>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Serialize a filter list to a JSON string.
pub fn serialize_filters(filters: &[Expr]) -> Result<String, serde_json::Error> {
    serde_json::to_string(filters)
}
