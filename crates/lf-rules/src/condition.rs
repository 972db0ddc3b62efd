//! Leaf conditions that evaluate against an [`ObjectState`].
//!
//! Each [`Condition`] variant checks a single aspect of an annotation object.
//! Conditions are composed into expression trees via [`Expr`](crate::Expr).

use lf_core::{ObjectState, ObjectType, ShapeType};
use serde::{Deserialize, Serialize};

/// A leaf condition that evaluates a single property of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Matches if the object's label is in the given list (exact match).
    Label(Vec<String>),
    /// Matches if the object is a shape of one of the given geometry kinds.
    /// Tags never match.
    ShapeType(Vec<ShapeType>),
    /// Matches if the object type is in the given list.
    ObjectType(Vec<ObjectType>),
    /// Matches if the occluded flag equals the given value.
    Occluded(bool),
    /// Matches if `z_order >= value`.
    MinZOrder(i32),
    /// Matches if `z_order <= value`.
    MaxZOrder(i32),
    /// Matches if the named attribute is present and its value is one of
    /// `values`. An empty `values` list matches any value.
    Attribute { name: String, values: Vec<String> },
}

impl Condition {
    /// Evaluate this condition against the given object state.
    pub fn evaluate(&self, state: &ObjectState) -> bool {
        match self {
            Condition::Label(labels) => labels.iter().any(|l| *l == state.label),
            Condition::ShapeType(types) => state
                .shape_type
                .map_or(false, |shape_type| types.contains(&shape_type)),
            Condition::ObjectType(types) => types.contains(&state.object_type),
            Condition::Occluded(value) => state.occluded == *value,
            Condition::MinZOrder(min) => state.z_order >= *min,
            Condition::MaxZOrder(max) => state.z_order <= *max,
            Condition::Attribute { name, values } => match state.attributes.get(name) {
                Some(actual) => values.is_empty() || values.iter().any(|v| v == actual),
                None => false,
            },
        }
    }
}
