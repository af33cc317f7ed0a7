//! What a pass sees while it executes

use std::collections::HashMap;

use crate::backend::command::RecordedCommands;
use crate::backend::traits::*;
use crate::backend::types::Extent2d;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::builder::FrameGraph;
use crate::render_graph::pass::PassNode;
use crate::render_graph::resource::FrameGraphResource;
use crate::scene::Scene;
use crate::settings::FrameGraphSettings;

/// Physical objects of the resources a pass declared.
///
/// Access is checked: asking for a resource the pass did not declare during
/// setup, or for the wrong kind of object, is an error.
pub struct FrameGraphPassResources<'a> {
    pub(crate) node: &'a PassNode,
    pub(crate) graph: &'a FrameGraph,
    pub(crate) objects: &'a HashMap<FrameGraphResource, GpuObject>,
    pub(crate) scene: &'a Scene,
    pub(crate) settings: &'a FrameGraphSettings,
    pub(crate) render_resolution: Extent2d,
}

impl<'a> FrameGraphPassResources<'a> {
    /// Type-erased object of a declared resource
    pub fn object(&self, resource: FrameGraphResource) -> GraphResult<GpuObject> {
        if !resource.is_assigned() {
            return Err(GraphError::InvalidHandle { operation: "get" });
        }
        if !self.node.declares(resource) {
            return Err(GraphError::UndeclaredAccess {
                pass: self.node.name.clone(),
                resource: self.graph.describe(resource),
            });
        }
        self.objects
            .get(&resource)
            .copied()
            .ok_or_else(|| GraphError::StaleHandle {
                handle: format!("{:?}", resource),
            })
    }

    /// Typed handle of a declared resource
    pub fn get<H: GpuHandle>(&self, resource: FrameGraphResource) -> GraphResult<H> {
        let object = self.object(resource)?;
        H::from_object(&object).ok_or_else(|| GraphError::KindMismatch {
            resource: self.graph.describe(resource),
            expected: H::KIND,
            actual: object.kind(),
        })
    }

    pub fn pass_name(&self) -> &str {
        &self.node.name
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn settings(&self) -> &FrameGraphSettings {
        self.settings
    }

    pub fn render_resolution(&self) -> Extent2d {
        self.render_resolution
    }

    pub fn frame_index(&self) -> u64 {
        self.graph.frame_index()
    }
}

/// Command buffers a pass produced, with the queue each one targets
#[derive(Debug, Default)]
pub struct PassOutput {
    submissions: Vec<(QueueKind, RecordedCommands)>,
}

impl PassOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an ended command buffer for submission
    pub fn submit(&mut self, queue: QueueKind, buffer: RecordedCommands) {
        self.submissions.push((queue, buffer));
    }

    pub fn submissions(&self) -> &[(QueueKind, RecordedCommands)] {
        &self.submissions
    }

    pub(crate) fn into_submissions(self) -> Vec<(QueueKind, RecordedCommands)> {
        self.submissions
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}
