//! The session a run operates on and the collaborators it is built from.
//!
//! A [`Session`] is a job or task handle bundling three collaborators: the
//! [`AnnotationStore`] that owns the current annotations, the
//! [`FrameProvider`] describing each frame, and the [`ObjectStateProvider`]
//! that applies user filters. Audit events go to the session's
//! [`EventBus`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lf_core::events::EventBus;
use lf_core::{Collection, FrameData, ObjectState, SessionId, SessionKind};
use lf_rules::Expr;

/// Owner of a session's annotations.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Snapshot of the full current collection.
    async fn export(&self) -> lf_core::Result<Collection>;

    /// Add `collection` to the current annotations, assigning client ids to
    /// shapes that have none.
    async fn import(&self, collection: Collection) -> lf_core::Result<()>;

    /// Remove all current annotations and any pending undo history.
    async fn clear(&self) -> lf_core::Result<()>;
}

/// Per-frame geometry and deletion status.
#[async_trait]
pub trait FrameProvider: Send + Sync {
    async fn get(&self, frame: u32) -> lf_core::Result<FrameData>;
}

/// Objects visible on a frame after filtering.
#[async_trait]
pub trait ObjectStateProvider: Send + Sync {
    /// States of the objects on `frame` that pass every expression in
    /// `filters`, in display order. `group_filter` restricts the result to
    /// one annotation group when set.
    async fn get_states(
        &self,
        frame: u32,
        include_deleted: bool,
        filters: &[Expr],
        group_filter: Option<&str>,
    ) -> lf_core::Result<Vec<ObjectState>>;
}

/// Handle to an annotation session.
#[derive(Clone)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub annotations: Arc<dyn AnnotationStore>,
    pub frames: Arc<dyn FrameProvider>,
    pub states: Arc<dyn ObjectStateProvider>,
    /// Audit log for runs against this session.
    pub events: Arc<EventBus>,
}

impl Session {
    /// Create a session with a fresh id and its own event bus.
    pub fn new(
        kind: SessionKind,
        annotations: Arc<dyn AnnotationStore>,
        frames: Arc<dyn FrameProvider>,
        states: Arc<dyn ObjectStateProvider>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            kind,
            annotations,
            frames,
            states,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Builder: share an existing event bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Builder: use a known session id.
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
