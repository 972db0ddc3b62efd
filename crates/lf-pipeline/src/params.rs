//! Parameter resolution for one chain position.
//!
//! Callers supply a flat string map per action. [`resolve`] merges it with
//! the action's declared defaults and coerces number parameters. Keys the
//! schema does not declare are ignored.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::action::{ParameterKind, ParameterSchema};

/// A resolved parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

impl ParameterValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

/// Resolved parameters handed to [`Action::init`](crate::Action::init).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParameterValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    /// Number value of `name`, if declared as a number.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParameterValue::as_number)
    }

    /// Text value of `name`, if declared as a select.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParameterValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }
}

/// Coerce a parameter string to a number.
///
/// Surrounding whitespace is ignored. Anything that is not a finite
/// number, including the empty string and spellings such as `inf` or
/// `nan`, becomes `NaN`; validating input is the caller's job.
pub fn coerce_number(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(f64::NAN)
}

/// Resolve `supplied` against `schema`.
///
/// Without a schema the result is empty. Otherwise every declared parameter
/// takes the supplied value when present, else its default.
pub fn resolve(schema: Option<&ParameterSchema>, supplied: &HashMap<String, String>) -> Parameters {
    let Some(schema) = schema else {
        return Parameters::new();
    };

    let resolved = schema
        .iter()
        .map(|(name, spec)| {
            let raw = supplied.get(name).unwrap_or(&spec.default);
            let value = match spec.kind {
                ParameterKind::Number => ParameterValue::Number(coerce_number(raw)),
                ParameterKind::Select => ParameterValue::Text(raw.clone()),
            };
            (name.clone(), value)
        })
        .collect();

    Parameters(resolved)
}
