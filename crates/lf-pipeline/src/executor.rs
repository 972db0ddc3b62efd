//! Pipeline executor: walks a frame range, pipes each frame's filtered shapes
//! through a chain of [`Action`]s, and commits the combined result in one step.
//!
//! A run moves through [`RunState::Init`], [`RunState::Iterating`],
//! [`RunState::Committing`] and [`RunState::Finalizing`]. Cancellation is
//! polled at fixed checkpoints in the first three and ends the run without
//! touching the store. Whatever happens, every action's `destroy` hook runs
//! exactly once and the audit event opened at the start is closed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{join_all, try_join_all};
use lf_core::config::PipelineConfig;
use lf_core::events::{EventCategory, EventPayload, RunStatus};
use lf_core::{Collection, Error, FrameMeta, ObjectType, RunId, Shape};
use lf_rules::Expr;

use crate::action::Action;
use crate::context::{CancelCheck, ProgressSender, RunContext};
use crate::params;
use crate::session::Session;
use crate::throttle::ThrottledProgress;

pub const MSG_INITIALIZING: &str = "Actions initialization";
pub const MSG_RUNNING: &str = "Actions are running";
pub const MSG_COMMITTING: &str = "Committing handled objects";
pub const MSG_FINALIZING: &str = "Finalizing";

/// Frame range and filters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// First frame, inclusive.
    pub from: u32,
    /// Last frame, inclusive.
    pub to: u32,
    /// Only shapes passing every expression are handed to the chain.
    pub filters: Vec<Expr>,
}

impl RunRequest {
    pub fn new(from: u32, to: u32) -> Self {
        Self {
            from,
            to,
            filters: Vec::new(),
        }
    }

    pub fn with_filters(mut self, filters: Vec<Expr>) -> Self {
        self.filters = filters;
        self
    }

    /// Number of frames in the range, deleted ones included.
    pub fn frame_count(&self) -> u64 {
        u64::from(self.to.saturating_sub(self.from)) + 1
    }

    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the range is reversed.
    pub fn validate(&self) -> lf_core::Result<()> {
        if self.from > self.to {
            return Err(Error::argument(format!(
                "invalid frame range: from ({}) is after to ({})",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Iterating,
    Committing,
    Finalizing,
    Done,
    Cancelled,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Iterating => write!(f, "iterating"),
            Self::Committing => write!(f, "committing"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Done => write!(f, "done"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The store now holds the combined result.
    Committed {
        /// Shapes in the committed collection.
        shapes: usize,
        /// Non-deleted frames piped through the chain.
        frames_processed: usize,
    },
    /// Cancellation was observed in the given stage; the store is unchanged.
    Cancelled { at: RunState },
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Runs a fixed chain of actions against a session.
pub struct PipelineExecutor {
    chain: Vec<Arc<dyn Action>>,
    parameters: Vec<HashMap<String, String>>,
    config: PipelineConfig,
}

impl PipelineExecutor {
    /// Create an executor for `chain`, with one parameter map per position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the parameter list does not match the
    /// chain length or an action appears twice in the chain.
    pub fn new(
        chain: Vec<Arc<dyn Action>>,
        parameters: Vec<HashMap<String, String>>,
    ) -> lf_core::Result<Self> {
        if chain.len() != parameters.len() {
            return Err(Error::argument(format!(
                "{} parameter sets supplied for {} actions",
                parameters.len(),
                chain.len()
            )));
        }

        let mut seen = HashSet::new();
        for action in &chain {
            if !seen.insert(action.name()) {
                return Err(Error::argument(format!(
                    "action \"{}\" appears more than once in the chain",
                    action.name()
                )));
            }
        }

        Ok(Self {
            chain,
            parameters,
            config: PipelineConfig::default(),
        })
    }

    /// Builder: override pauses and progress throttling.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Action names in chain order, joined by `" -> "`.
    pub fn chain_description(&self) -> String {
        self.chain
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Run the chain over `request` against `session`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for an invalid request, before any hook
    /// is called. Errors from `init`, `run` or the session's collaborators
    /// are returned after teardown; the store is not modified in that case.
    /// Cancellation is not an error.
    pub async fn execute(
        &self,
        session: &Session,
        request: &RunRequest,
        ctx: &RunContext,
    ) -> lf_core::Result<RunOutcome> {
        request.validate()?;

        let run_id = RunId::new();
        let chain = self.chain_description();
        let started = Instant::now();
        session.events.broadcast(
            EventCategory::Audit,
            EventPayload::ActionsRunStarted {
                run_id,
                session_id: session.id,
                from: request.from,
                to: request.to,
                chain: chain.clone(),
            },
        );
        tracing::info!(
            %run_id,
            session = %session.id,
            from = request.from,
            to = request.to,
            "Running actions: {chain}"
        );

        let mut progress = ThrottledProgress::new(&ctx.progress, self.config.progress_interval());
        let result = self
            .run_stages(session, request, &ctx.cancellation, &mut progress)
            .await;

        stage_message(&mut progress, 100.0, MSG_FINALIZING);
        self.teardown().await;

        let (status, error) = match &result {
            Ok(RunOutcome::Committed { .. }) => (RunStatus::Completed, None),
            Ok(RunOutcome::Cancelled { .. }) => (RunStatus::Cancelled, None),
            Err(e) => (RunStatus::Failed, Some(e.to_string())),
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        session.events.broadcast(
            EventCategory::Audit,
            EventPayload::ActionsRunFinished {
                run_id,
                status,
                duration_ms,
                error,
            },
        );

        match &result {
            Ok(RunOutcome::Committed {
                shapes,
                frames_processed,
            }) => tracing::info!(
                %run_id,
                shapes,
                frames_processed,
                duration_ms,
                "Actions run completed"
            ),
            Ok(RunOutcome::Cancelled { at }) => {
                tracing::info!(%run_id, stage = %at, "Actions run cancelled")
            }
            Err(e) => tracing::error!(%run_id, kind = e.kind(), "Actions run failed: {e}"),
        }

        result
    }

    async fn run_stages(
        &self,
        session: &Session,
        request: &RunRequest,
        cancel: &CancelCheck,
        progress: &mut ThrottledProgress<'_>,
    ) -> lf_core::Result<RunOutcome> {
        // Init
        stage_message(progress, 0.0, MSG_INITIALIZING);
        pause(self.config.init_pause()).await;
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled { at: RunState::Init });
        }

        try_join_all(self.chain.iter().zip(&self.parameters).map(|(action, supplied)| {
            let resolved = params::resolve(action.parameters(), supplied);
            tracing::debug!(action = action.name(), parameters = ?resolved, "Initializing action");
            action.init(session, resolved)
        }))
        .await?;
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled { at: RunState::Init });
        }

        let snapshot = session.annotations.export().await?;

        // Iterating
        let total = request.frame_count();
        let mut walked: u64 = 0;
        let mut frames_processed = 0;
        let mut handled: Vec<Shape> = Vec::new();
        let mut handled_ids: HashSet<u64> = HashSet::new();

        for number in request.from..=request.to {
            let frame = session.frames.get(number).await?;
            walked += 1;

            if frame.deleted {
                tracing::debug!(frame = number, "Skipping deleted frame");
            } else {
                let states = session
                    .states
                    .get_states(number, false, &request.filters, None)
                    .await?;
                let ids: HashSet<u64> = states
                    .iter()
                    .filter(|s| s.object_type == ObjectType::Shape)
                    .filter_map(|s| s.client_id)
                    .collect();

                let input: Vec<Shape> = snapshot
                    .shapes
                    .iter()
                    .filter(|s| s.client_id.is_some_and(|id| ids.contains(&id)))
                    .cloned()
                    .collect();
                let input_len = input.len();

                let output = self.apply_chain(input, &frame.meta()).await?;
                tracing::debug!(
                    frame = number,
                    input = input_len,
                    output = output.len(),
                    "Frame handled"
                );

                handled.extend(output.into_iter().map(|mut shape| {
                    shape.client_id = None;
                    shape
                }));
                handled_ids.extend(ids);
                frames_processed += 1;
            }

            progress.report(percent(walked, total), MSG_RUNNING);
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled {
                    at: RunState::Iterating,
                });
            }
        }

        // Committing
        stage_message(progress, 100.0, MSG_COMMITTING);
        pause(self.config.commit_pause()).await;
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled {
                at: RunState::Committing,
            });
        }

        let Collection {
            shapes: original,
            tracks,
            tags,
        } = snapshot;
        let carried: Vec<Shape> = original
            .into_iter()
            .filter(|s| s.client_id.map_or(true, |id| !handled_ids.contains(&id)))
            .collect();
        tracing::debug!(
            handled = handled.len(),
            carried = carried.len(),
            "Combining annotations"
        );
        handled.extend(carried);
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled {
                at: RunState::Committing,
            });
        }

        // Finalizing
        let shapes = handled.len();
        session.annotations.clear().await?;
        session
            .annotations
            .import(Collection {
                shapes: handled,
                tracks,
                tags,
            })
            .await?;

        Ok(RunOutcome::Committed {
            shapes,
            frames_processed,
        })
    }

    /// Pipe one frame's shapes through every action in order.
    async fn apply_chain(&self, mut shapes: Vec<Shape>, frame: &FrameMeta) -> lf_core::Result<Vec<Shape>> {
        for action in &self.chain {
            shapes = action.run(shapes, frame).await?;
            let elsewhere = shapes.iter().filter(|s| s.frame != frame.number).count();
            if elsewhere > 0 {
                tracing::debug!(
                    action = action.name(),
                    frame = frame.number,
                    shapes = elsewhere,
                    "Action returned shapes for other frames"
                );
            }
        }
        Ok(shapes)
    }

    /// Call `destroy` on every action. Failures are logged and swallowed.
    async fn teardown(&self) {
        let results = join_all(self.chain.iter().map(|action| async move {
            (action.name(), action.destroy().await)
        }))
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                tracing::warn!(action = name, "Action teardown failed: {e}");
            }
        }
    }
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("chain", &self.chain_description())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run `chain` over `from..=to` with the default pipeline timing.
///
/// `parameters` holds one map per chain position. See
/// [`PipelineExecutor::execute`] for the error contract.
#[allow(clippy::too_many_arguments)]
pub async fn run_actions(
    session: &Session,
    chain: Vec<Arc<dyn Action>>,
    parameters: Vec<HashMap<String, String>>,
    from: u32,
    to: u32,
    filters: Vec<Expr>,
    progress: ProgressSender,
    cancel: CancelCheck,
) -> lf_core::Result<RunOutcome> {
    let request = RunRequest::new(from, to).with_filters(filters);
    let executor = PipelineExecutor::new(chain, parameters)?;
    let ctx = RunContext::new()
        .with_progress(progress)
        .with_cancellation(cancel);
    executor.execute(session, &request, &ctx).await
}

/// `ceil(done / total * 100)`.
fn percent(done: u64, total: u64) -> f32 {
    if total == 0 {
        return 100.0;
    }
    ((done * 100).div_ceil(total)) as f32
}

/// Send a stage message past the throttle, after any held update.
fn stage_message(progress: &mut ThrottledProgress<'_>, pct: f32, message: &str) {
    progress.flush();
    progress.report(pct, message);
    progress.flush();
    tracing::info!("[{pct:.0}%] {message}");
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
