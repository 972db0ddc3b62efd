//! # lf-pipeline
//!
//! Batch annotation actions over a range of frames.
//!
//! This crate provides:
//!
//! - **[`Action`]** trait -- a per-frame shape transform with `init` /
//!   `run` / `destroy` lifecycle hooks and a declared parameter schema.
//! - **[`ActionRegistry`]** -- the catalog of available actions, unique by
//!   name, always seeded with the built-in actions ([`actions`]).
//! - **[`params`]** -- resolution of caller-supplied parameter strings
//!   against a schema.
//! - **[`Session`]** -- the handle a run operates on, bundling the annotation
//!   store, frame provider and object-state provider ([`session`]), with
//!   in-memory implementations in [`memory`].
//! - **[`PipelineExecutor`]** / [`run_actions`] -- walk the frame range,
//!   pipe each frame's filtered shapes through the chain, and commit the
//!   combined result in one step, with throttled progress
//!   ([`throttle`]) and cooperative cancellation ([`context`]).

pub mod action;
pub mod actions;
pub mod context;
pub mod executor;
pub mod memory;
pub mod params;
pub mod registry;
pub mod session;
pub mod throttle;

// Re-export key types at the crate root.
pub use action::{Action, ParameterKind, ParameterSchema, ParameterSpec};
pub use context::{CancelCheck, ProgressSender, RunContext};
pub use executor::{run_actions, PipelineExecutor, RunOutcome, RunRequest, RunState};
pub use memory::{MemoryAnnotations, MemoryFrames, SessionDump};
pub use params::{ParameterValue, Parameters};
pub use registry::ActionRegistry;
pub use session::{AnnotationStore, FrameProvider, ObjectStateProvider, Session};
