//! Frame graph pass definitions

use crate::error::GraphResult;
use crate::render_graph::builder::FrameGraphBuilder;
use crate::render_graph::resource::FrameGraphResource;
use crate::render_graph::resources::{FrameGraphPassResources, PassOutput};
use smallvec::SmallVec;
use std::any::{Any, TypeId};

/// Identifier of a pass within one frame, in setup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Trait for frame graph passes
///
/// A pass instance lives across frames. `setup` runs every frame and only
/// records declarations through the builder; `execute` records commands
/// against the physical objects the frame graph resolved.
pub trait FrameGraphPass: Send + Sync {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Setup phase - declare resources and dependencies
    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()>;

    /// Execute phase - record commands
    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()>;

    /// Allow downcasting
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Type identity used by the pass registry
    fn pass_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }
}

pub(crate) type AccessList = SmallVec<[FrameGraphResource; 8]>;

/// Declarations a pass made during setup
#[derive(Debug)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub(crate) reads: AccessList,
    pub(crate) writes: AccessList,
    pub(crate) persists: AccessList,
}

impl PassNode {
    pub(crate) fn new(id: PassId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            reads: SmallVec::new(),
            writes: SmallVec::new(),
            persists: SmallVec::new(),
        }
    }

    pub fn reads(&self) -> &[FrameGraphResource] {
        &self.reads
    }

    pub fn writes(&self) -> &[FrameGraphResource] {
        &self.writes
    }

    pub fn persists(&self) -> &[FrameGraphResource] {
        &self.persists
    }

    pub fn reads_resource(&self, resource: FrameGraphResource) -> bool {
        self.reads.contains(&resource)
    }

    pub fn writes_resource(&self, resource: FrameGraphResource) -> bool {
        self.writes.contains(&resource)
    }

    /// Whether execute may touch the resource
    pub fn declares(&self, resource: FrameGraphResource) -> bool {
        self.reads_resource(resource)
            || self.writes_resource(resource)
            || self.persists.contains(&resource)
    }

    /// Every resource the pass references, possibly repeated
    pub fn accesses(&self) -> impl Iterator<Item = FrameGraphResource> + '_ {
        self.reads
            .iter()
            .chain(self.writes.iter())
            .chain(self.persists.iter())
            .copied()
    }

    pub(crate) fn push_unique(list: &mut AccessList, resource: FrameGraphResource) {
        if !list.contains(&resource) {
            list.push(resource);
        }
    }
}
