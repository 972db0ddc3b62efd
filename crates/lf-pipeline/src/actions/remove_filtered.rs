use async_trait::async_trait;
use lf_core::{FrameMeta, Shape};

use crate::action::Action;
use crate::params::Parameters;
use crate::session::Session;

pub const REMOVE_FILTERED_SHAPES: &str = "Remove filtered shapes";

/// Deletes every shape it is given.
///
/// Combined with run filters this removes exactly the matching shapes in the
/// frame range and leaves everything else alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveFilteredShapes;

#[async_trait]
impl Action for RemoveFilteredShapes {
    fn name(&self) -> &str {
        REMOVE_FILTERED_SHAPES
    }

    async fn init(&self, _session: &Session, _parameters: Parameters) -> lf_core::Result<()> {
        Ok(())
    }

    async fn run(&self, shapes: Vec<Shape>, frame: &FrameMeta) -> lf_core::Result<Vec<Shape>> {
        tracing::debug!(frame = frame.number, removed = shapes.len(), "Removing shapes");
        Ok(Vec::new())
    }

    async fn destroy(&self) -> lf_core::Result<()> {
        Ok(())
    }
}
