//! Built-in actions.
//!
//! Every [`ActionRegistry`](crate::ActionRegistry) starts with these.

use std::sync::Arc;

use crate::action::Action;

mod remove_filtered;

pub use remove_filtered::{RemoveFilteredShapes, REMOVE_FILTERED_SHAPES};

/// Fresh instances of all built-in actions, in registration order.
pub fn builtin() -> Vec<Arc<dyn Action>> {
    vec![Arc::new(RemoveFilteredShapes)]
}
