//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lf_core::config::PipelineConfig;
use lf_core::{Collection, Error, FrameMeta, SessionKind, Shape, ShapeType};
use lf_pipeline::{
    Action, MemoryAnnotations, MemoryFrames, ParameterSchema, ParameterSpec, Parameters,
    PipelineExecutor, Session,
};
use parking_lot::Mutex;
use tokio::sync::Barrier;

/// Which hook, if any, should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAt {
    #[default]
    Nowhere,
    Init,
    Frame(u32),
    Destroy,
}

/// Moves every shape right by `dx` and records how it was driven.
pub struct ShiftAction {
    schema: ParameterSchema,
    pub fail: FailAt,
    pub inits: AtomicUsize,
    pub runs: AtomicUsize,
    pub destroys: AtomicUsize,
    pub seen_parameters: Mutex<Vec<Parameters>>,
    dx: Mutex<f64>,
}

impl ShiftAction {
    pub const NAME: &'static str = "Shift shapes";

    pub fn new() -> Self {
        Self::failing(FailAt::Nowhere)
    }

    pub fn failing(fail: FailAt) -> Self {
        let mut schema = ParameterSchema::new();
        schema.insert("dx".into(), ParameterSpec::bounded_number(-100.0, 100.0, 1.0, "1"));
        schema.insert("axis".into(), ParameterSpec::select(["x", "y"], "x"));
        Self {
            schema,
            fail,
            inits: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            seen_parameters: Mutex::new(Vec::new()),
            dx: Mutex::new(0.0),
        }
    }

    pub fn destroyed(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Action for ShiftAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Option<&ParameterSchema> {
        Some(&self.schema)
    }

    async fn init(&self, _session: &Session, parameters: Parameters) -> lf_core::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail == FailAt::Init {
            return Err(Error::scripting(Self::NAME, "init failed"));
        }
        *self.dx.lock() = parameters.number("dx").unwrap_or(0.0);
        self.seen_parameters.lock().push(parameters);
        Ok(())
    }

    async fn run(&self, shapes: Vec<Shape>, frame: &FrameMeta) -> lf_core::Result<Vec<Shape>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail == FailAt::Frame(frame.number) {
            return Err(Error::scripting(Self::NAME, "run failed"));
        }
        let dx = *self.dx.lock();
        Ok(shapes
            .into_iter()
            .map(|mut s| {
                for x in s.points.iter_mut().step_by(2) {
                    *x += dx;
                }
                s
            })
            .collect())
    }

    async fn destroy(&self) -> lf_core::Result<()> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        if self.fail == FailAt::Destroy {
            return Err(Error::Internal("destroy failed".into()));
        }
        Ok(())
    }
}

/// Waits at a shared barrier during `init` and logs every hook it finishes.
pub struct RendezvousAction {
    name: &'static str,
    barrier: Arc<Barrier>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RendezvousAction {
    pub fn new(name: &'static str, barrier: Arc<Barrier>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name, barrier, log }
    }
}

#[async_trait]
impl Action for RendezvousAction {
    fn name(&self) -> &str {
        self.name
    }

    async fn init(&self, _session: &Session, _parameters: Parameters) -> lf_core::Result<()> {
        self.barrier.wait().await;
        self.log.lock().push(format!("{} init", self.name));
        Ok(())
    }

    async fn run(&self, shapes: Vec<Shape>, frame: &FrameMeta) -> lf_core::Result<Vec<Shape>> {
        self.log.lock().push(format!("{} run {}", self.name, frame.number));
        Ok(shapes)
    }

    async fn destroy(&self) -> lf_core::Result<()> {
        Ok(())
    }
}

pub fn rect(frame: u32, label: &str) -> Shape {
    Shape::new(ShapeType::Rectangle, frame, label).with_points(vec![0.0, 0.0, 10.0, 10.0])
}

/// A job session over `frames` holding `shapes`.
pub fn memory_session(shapes: Vec<Shape>, frames: MemoryFrames) -> (Session, Arc<MemoryAnnotations>) {
    collection_session(Collection::from_shapes(shapes), frames)
}

/// A job session over `frames` holding a full collection.
pub fn collection_session(
    collection: Collection,
    frames: MemoryFrames,
) -> (Session, Arc<MemoryAnnotations>) {
    let store = Arc::new(MemoryAnnotations::new(collection).expect("valid fixture"));
    let session = Session::new(SessionKind::Job, store.clone(), Arc::new(frames), store.clone());
    (session, store)
}

/// Executor without pauses or throttling, every action on default parameters.
pub fn immediate(chain: Vec<Arc<dyn Action>>) -> PipelineExecutor {
    let parameters = vec![HashMap::new(); chain.len()];
    PipelineExecutor::new(chain, parameters)
        .expect("valid chain")
        .with_config(PipelineConfig::immediate())
}
