//! The [`Action`] trait defines one annotation transform.
//!
//! An action is registered once and reused across runs. For each run the
//! executor calls [`init`](Action::init) with resolved parameters, then
//! [`run`](Action::run) once per retained frame, then
//! [`destroy`](Action::destroy) exactly once whatever the outcome. Actions
//! are not reentrant: a single instance never serves two runs at a time.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use lf_core::{FrameMeta, Shape};
use serde::{Deserialize, Serialize};

use crate::params::Parameters;
use crate::session::Session;

/// Value kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// One of an enumerated list of tokens.
    Select,
    /// A number. `values` holds `[min, max, step]` when bounded.
    Number,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "select"),
            Self::Number => write!(f, "number"),
        }
    }
}

/// Declaration of one action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub kind: ParameterKind,
    #[serde(default)]
    pub values: Vec<String>,
    pub default: String,
}

impl ParameterSpec {
    /// A select parameter over `values`.
    pub fn select<I, S>(values: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: ParameterKind::Select,
            values: values.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    /// An unbounded number parameter.
    pub fn number(default: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Number,
            values: Vec::new(),
            default: default.into(),
        }
    }

    /// A number parameter with `[min, max, step]` bounds for UIs.
    pub fn bounded_number(min: f64, max: f64, step: f64, default: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Number,
            values: vec![min.to_string(), max.to_string(), step.to_string()],
            default: default.into(),
        }
    }
}

/// Declared parameters of an action, keyed by parameter name.
pub type ParameterSchema = BTreeMap<String, ParameterSpec>;

/// A per-frame annotation transform.
///
/// Implementations that keep per-run state (configured in `init`) hold it
/// behind interior mutability, since the executor only has shared access.
#[async_trait]
pub trait Action: Send + Sync {
    /// Unique, human-readable name (e.g. "Remove filtered shapes").
    fn name(&self) -> &str;

    /// Declared parameters, or `None` when the action takes none.
    fn parameters(&self) -> Option<&ParameterSchema> {
        None
    }

    /// Prepare for a run. Called once per run, concurrently with the other
    /// actions of the chain, before any frame is processed.
    async fn init(&self, session: &Session, parameters: Parameters) -> lf_core::Result<()>;

    /// Transform the shapes of one frame. Receives the previous action's
    /// output (or the frame's filtered shapes for the first action) and
    /// returns the shapes handed to the next one.
    async fn run(&self, shapes: Vec<Shape>, frame: &FrameMeta) -> lf_core::Result<Vec<Shape>>;

    /// Release per-run state. Called exactly once per run, even when the
    /// run failed or was cancelled.
    async fn destroy(&self) -> lf_core::Result<()>;
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
