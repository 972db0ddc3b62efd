//! Registry of available actions.
//!
//! The [`ActionRegistry`] is an explicit handle, not global state: callers
//! create one (seeded with the [built-in actions](crate::actions)) and pass it
//! to whatever needs to look actions up. Names are unique and
//! case-sensitive; there is no way to unregister.

use std::sync::Arc;

use lf_core::events::{EventBus, EventCategory, EventPayload};
use lf_core::Error;
use parking_lot::RwLock;

use crate::action::{Action, ParameterKind, ParameterSchema};
use crate::actions;
use crate::params::coerce_number;

pub struct ActionRegistry {
    actions: RwLock<Vec<Arc<dyn Action>>>,
    events: Option<Arc<EventBus>>,
}

impl ActionRegistry {
    /// Create a registry holding only the built-in actions.
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(actions::builtin()),
            events: None,
        }
    }

    /// Builder: announce successful registrations on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Snapshot of all registered actions, in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Action>> {
        self.actions.read().clone()
    }

    /// Look up an action by its exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions
            .read()
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.read().is_empty()
    }

    /// Register a new action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the action's name is blank, its
    /// parameter schema is malformed, or an action with the same name is
    /// already registered. The registry is left unchanged on error.
    pub fn register(&self, action: Arc<dyn Action>) -> lf_core::Result<()> {
        check_capabilities(action.as_ref())?;

        let name = action.name().to_string();
        {
            let mut actions = self.actions.write();
            if actions.iter().any(|a| a.name() == name) {
                return Err(Error::argument(format!(
                    "action \"{name}\" is already registered"
                )));
            }
            actions.push(action);
        }

        tracing::info!(action = %name, "Registered action");
        if let Some(events) = &self.events {
            events.broadcast(
                EventCategory::Registry,
                EventPayload::ActionRegistered { name },
            );
        }
        Ok(())
    }

    /// Map chain names to registered actions, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] naming the first unknown action.
    pub fn resolve_chain<S: AsRef<str>>(&self, names: &[S]) -> lf_core::Result<Vec<Arc<dyn Action>>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .ok_or_else(|| Error::argument(format!("unknown action \"{name}\"")))
            })
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .actions
            .read()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        f.debug_struct("ActionRegistry")
            .field("actions", &names)
            .finish_non_exhaustive()
    }
}

fn check_capabilities(action: &dyn Action) -> lf_core::Result<()> {
    let name = action.name();
    if name.trim().is_empty() {
        return Err(Error::argument("action name must not be blank"));
    }
    if let Some(schema) = action.parameters() {
        check_schema(name, schema)?;
    }
    Ok(())
}

fn check_schema(action: &str, schema: &ParameterSchema) -> lf_core::Result<()> {
    let invalid = |param: &str, reason: String| {
        Err(Error::argument(format!(
            "action \"{action}\": parameter \"{param}\" {reason}"
        )))
    };

    for (param, spec) in schema {
        if param.trim().is_empty() {
            return Err(Error::argument(format!(
                "action \"{action}\": parameter names must not be empty"
            )));
        }

        match spec.kind {
            ParameterKind::Select => {
                if spec.values.is_empty() {
                    return invalid(param, "has no values".into());
                }
                if !spec.values.contains(&spec.default) {
                    return invalid(
                        param,
                        format!("default \"{}\" is not one of its values", spec.default),
                    );
                }
            }
            ParameterKind::Number => {
                if coerce_number(&spec.default).is_nan() {
                    return invalid(
                        param,
                        format!("default \"{}\" is not a number", spec.default),
                    );
                }
                if let Some(bad) = spec.values.iter().find(|v| coerce_number(v).is_nan()) {
                    return invalid(param, format!("bound \"{bad}\" is not a number"));
                }
            }
        }
    }
    Ok(())
}
