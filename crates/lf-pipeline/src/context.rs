//! Progress reporting and cancellation for a pipeline run.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Sender for reporting progress to the caller.
///
/// Wraps a callback that receives a progress percentage (0.0 -- 100.0) and a
/// human-readable stage message.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
}

impl ProgressSender {
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    pub fn send(&self, progress: f32, message: &str) {
        (self.callback)(progress, message);
    }
}

impl fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Cooperative cancellation query.
///
/// The executor polls it at fixed checkpoints and never interrupts an action
/// that is already running. It is up to the caller to make it return `true`
/// once the user asks to cancel.
#[derive(Clone)]
pub struct CancelCheck {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl CancelCheck {
    pub fn new(predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// A check that never reports cancellation.
    pub fn never() -> Self {
        Self::new(|| false)
    }

    pub fn is_cancelled(&self) -> bool {
        (self.predicate)()
    }
}

impl From<CancellationToken> for CancelCheck {
    fn from(token: CancellationToken) -> Self {
        Self::new(move || token.is_cancelled())
    }
}

impl Default for CancelCheck {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for CancelCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelCheck").finish_non_exhaustive()
    }
}

/// Caller-side controls of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Channel for reporting progress to the caller.
    pub progress: Arc<ProgressSender>,
    /// Polled at every cancellation checkpoint.
    pub cancellation: CancelCheck,
}

impl RunContext {
    /// A context with no progress sink that is never cancelled.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(ProgressSender::noop()),
            cancellation: CancelCheck::never(),
        }
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Builder: attach a cancellation check.
    pub fn with_cancellation(mut self, cancellation: impl Into<CancelCheck>) -> Self {
        self.cancellation = cancellation.into();
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
