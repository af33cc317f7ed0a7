//! Frame graph recording
//!
//! [`FrameGraph`] holds everything passes declared for the current frame.
//! Passes never see it directly: each setup call receives a
//! [`FrameGraphBuilder`] bound to that pass.

use bytemuck::Pod;
use slotmap::SlotMap;

use crate::backend::traits::{BackBuffer, GpuHandle};
use crate::backend::types::*;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::pass::{PassId, PassNode};
use crate::render_graph::resource::*;
use crate::render_graph::slot::{FrameGraphSlot, SlotTable};
use crate::scene::Scene;
use crate::settings::FrameGraphSettings;

/// Bytes produced for an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBuffer {
    data: Vec<u8>,
}

impl UploadBuffer {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_slice<T: Pod>(values: &[T]) -> Self {
        Self {
            data: bytemuck::cast_slice(values).to_vec(),
        }
    }

    pub fn from_value<T: Pod>(value: &T) -> Self {
        Self {
            data: bytemuck::bytes_of(value).to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Deferred data producer registered with [`FrameGraphBuilder::upload`]
pub type UploadProducer = Box<dyn FnOnce() -> UploadBuffer + Send + Sync>;

pub(crate) struct PendingUpload {
    pub pass: PassId,
    pub resource: FrameGraphResource,
    pub producer: UploadProducer,
}

/// The graph recorded for one frame
pub struct FrameGraph {
    resources: SlotMap<ResourceKey, ResourceEntry>,
    passes: Vec<PassNode>,
    uploads: Vec<PendingUpload>,
    slots: SlotTable,
    back_buffer: Option<FrameGraphResource>,
    frame_index: u64,
    next_sequence: u64,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self {
            resources: SlotMap::with_key(),
            passes: Vec::new(),
            uploads: Vec::new(),
            slots: SlotTable::new(),
            back_buffer: None,
            frame_index: 0,
            next_sequence: 0,
        }
    }

    /// Start recording a new frame.
    ///
    /// Resources persisted last frame are kept as carried resources under
    /// the same handles. Everything else is dropped and its handles go stale.
    pub fn reset(&mut self, frame_index: u64) {
        self.resources.retain(|_, entry| entry.persist);
        for entry in self.resources.values_mut() {
            entry.persist = false;
            entry.carried = true;
            entry.carried_desc = Some(entry.desc.clone());
        }
        self.passes.clear();
        self.uploads.clear();
        self.slots.clear();
        self.back_buffer = None;
        self.frame_index = frame_index;
    }

    /// Throw away what the current frame recorded.
    ///
    /// Resources created by this frame are dropped. Carried resources get
    /// back the descriptor they were carried in with, and survive only when
    /// `holds` reports their physical object still matches it. The others go
    /// stale, so whoever owns them creates and fills them again.
    pub fn abort(&mut self, holds: impl Fn(ResourceKey, &ResourceDesc) -> bool) {
        self.resources.retain(|key, entry| {
            let Some(desc) = entry.carried_desc.take() else {
                return false;
            };
            entry.desc = desc;
            entry.persist = true;
            let kept = holds(key, &entry.desc);
            if !kept {
                log::debug!("Dropping carried resource '{}' the failed frame lost", entry.name);
            }
            kept
        });
        self.passes.clear();
        self.uploads.clear();
        self.slots.clear();
        self.back_buffer = None;
    }

    /// Drop every resource, persisted ones included. Handles from before go stale.
    pub fn clear(&mut self) {
        self.resources.clear();
        self.passes.clear();
        self.uploads.clear();
        self.slots.clear();
        self.back_buffer = None;
    }

    pub(crate) fn begin_pass(&mut self, name: &str) -> PassId {
        let id = PassId(self.passes.len() as u32);
        self.passes.push(PassNode::new(id, name));
        id
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn passes(&self) -> &[PassNode] {
        &self.passes
    }

    pub fn pass(&self, id: PassId) -> Option<&PassNode> {
        self.passes.get(id.index())
    }

    pub fn resource(&self, resource: FrameGraphResource) -> Option<&ResourceEntry> {
        if !resource.is_assigned() {
            return None;
        }
        self.resources.get(resource.key())
    }

    /// Every live resource with its handle
    pub fn resources(&self) -> impl Iterator<Item = (FrameGraphResource, &ResourceEntry)> {
        self.resources
            .iter()
            .map(|(key, entry)| (FrameGraphResource::new(key), entry))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Whether the resource's physical object must survive this frame
    pub(crate) fn survives(&self, key: ResourceKey) -> bool {
        self.resources.get(key).map(|e| e.persist).unwrap_or(false)
    }

    pub(crate) fn take_uploads(&mut self) -> Vec<PendingUpload> {
        std::mem::take(&mut self.uploads)
    }

    pub(crate) fn uploads(&self) -> impl Iterator<Item = (PassId, FrameGraphResource)> + '_ {
        self.uploads.iter().map(|u| (u.pass, u.resource))
    }

    /// Name of a resource for diagnostics
    pub(crate) fn describe(&self, resource: FrameGraphResource) -> String {
        match self.resource(resource) {
            Some(entry) => entry.name.clone(),
            None => format!("{:?}", resource),
        }
    }

    pub(crate) fn validate(
        &self,
        resource: FrameGraphResource,
        operation: &'static str,
    ) -> GraphResult<&ResourceEntry> {
        if !resource.is_assigned() {
            return Err(GraphError::InvalidHandle { operation });
        }
        self.resources
            .get(resource.key())
            .ok_or_else(|| GraphError::StaleHandle {
                handle: format!("{:?}", resource),
            })
    }
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder handed to a pass during setup
pub struct FrameGraphBuilder<'a> {
    graph: &'a mut FrameGraph,
    pass: PassId,
    settings: &'a FrameGraphSettings,
    scene: &'a Scene,
    back_buffer: &'a BackBuffer,
}

impl<'a> FrameGraphBuilder<'a> {
    pub(crate) fn new(
        graph: &'a mut FrameGraph,
        pass: PassId,
        settings: &'a FrameGraphSettings,
        scene: &'a Scene,
        back_buffer: &'a BackBuffer,
    ) -> Self {
        Self {
            graph,
            pass,
            settings,
            scene,
            back_buffer,
        }
    }

    /// Create a resource of any kind from its descriptor
    pub fn create_resource(&mut self, name: &str, desc: ResourceDesc) -> FrameGraphResource {
        let sequence = self.graph.next_sequence;
        self.graph.next_sequence += 1;
        let key = self
            .graph
            .resources
            .insert(ResourceEntry::new(name, desc, sequence));
        FrameGraphResource::new(key)
    }

    pub fn create_vertex_buffer(&mut self, name: &str, desc: VertexBufferDesc) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::VertexBuffer(desc))
    }

    pub fn create_index_buffer(&mut self, name: &str, desc: IndexBufferDesc) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::IndexBuffer(desc))
    }

    pub fn create_uniform_buffer(
        &mut self,
        name: &str,
        desc: UniformBufferDesc,
    ) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::UniformBuffer(desc))
    }

    pub fn create_shader_storage_buffer(
        &mut self,
        name: &str,
        desc: ShaderStorageBufferDesc,
    ) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::ShaderStorageBuffer(desc))
    }

    pub fn create_texture_buffer(
        &mut self,
        name: &str,
        desc: TextureBufferDesc,
    ) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::TextureBuffer(desc))
    }

    pub fn create_texture_array_buffer(
        &mut self,
        name: &str,
        desc: TextureArrayBufferDesc,
    ) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::TextureArrayBuffer(desc))
    }

    pub fn create_render_target(&mut self, name: &str, desc: RenderTargetDesc) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::RenderTarget(desc))
    }

    pub fn create_render_pass(&mut self, name: &str, desc: RenderPassDesc) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::RenderPass(desc))
    }

    pub fn create_render_pipeline(
        &mut self,
        name: &str,
        desc: RenderPipelineDesc,
    ) -> FrameGraphResource {
        self.create_resource(name, ResourceDesc::RenderPipeline(desc))
    }

    /// Declare that this pass reads from a resource
    pub fn read(&mut self, resource: FrameGraphResource) -> GraphResult<()> {
        self.graph.validate(resource, "read")?;
        let node = &mut self.graph.passes[self.pass.index()];
        PassNode::push_unique(&mut node.reads, resource);
        Ok(())
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: FrameGraphResource) -> GraphResult<()> {
        self.graph.validate(resource, "write")?;
        let node = &mut self.graph.passes[self.pass.index()];
        PassNode::push_unique(&mut node.writes, resource);
        Ok(())
    }

    /// Keep the resource's physical object alive into the next frame
    pub fn persist(&mut self, resource: FrameGraphResource) -> GraphResult<()> {
        let entry = self.graph.validate(resource, "persist")?;
        if entry.imported.is_some() {
            log::warn!("Ignoring persist of imported resource '{}'", entry.name);
            return Ok(());
        }
        if let Some(entry) = self.graph.resources.get_mut(resource.key()) {
            entry.persist = true;
        }
        let node = &mut self.graph.passes[self.pass.index()];
        PassNode::push_unique(&mut node.persists, resource);
        Ok(())
    }

    /// Fill the resource with data produced when it is realised.
    ///
    /// The producer is not called during setup. Counts as a write.
    pub fn upload<F>(&mut self, resource: FrameGraphResource, producer: F) -> GraphResult<()>
    where
        F: FnOnce() -> UploadBuffer + Send + Sync + 'static,
    {
        self.graph.validate(resource, "upload")?;
        let node = &mut self.graph.passes[self.pass.index()];
        PassNode::push_unique(&mut node.writes, resource);
        self.graph.uploads.push(PendingUpload {
            pass: self.pass,
            resource,
            producer: Box::new(producer),
        });
        Ok(())
    }

    /// Change the descriptor of an existing resource.
    ///
    /// Used for carried resources whose parameters changed, e.g. a persisted
    /// render target after a resize. The physical object is recreated when the
    /// descriptor differs from the one it was created with.
    pub fn redeclare(&mut self, resource: FrameGraphResource, desc: ResourceDesc) -> GraphResult<()> {
        let entry = self.graph.validate(resource, "redeclare")?;
        if entry.kind() != desc.kind() {
            return Err(GraphError::KindMismatch {
                resource: entry.name.clone(),
                expected: entry.kind(),
                actual: desc.kind(),
            });
        }
        if let Some(entry) = self.graph.resources.get_mut(resource.key()) {
            entry.desc = desc;
        }
        Ok(())
    }

    pub fn assign_slot(&mut self, slot: FrameGraphSlot, resource: FrameGraphResource) -> GraphResult<()> {
        self.graph.validate(resource, "assign_slot")?;
        self.graph.slots.assign(slot, resource)
    }

    /// The resource bound to a slot, or an unassigned handle
    pub fn get_slot(&self, slot: FrameGraphSlot) -> FrameGraphResource {
        self.graph.slots.get(slot)
    }

    pub fn check_slot(&self, slot: FrameGraphSlot) -> bool {
        self.graph.slots.check(slot)
    }

    /// The device back buffer as an imported resource
    pub fn back_buffer(&mut self) -> FrameGraphResource {
        if let Some(resource) = self.graph.back_buffer {
            return resource;
        }
        let mut entry = ResourceEntry::new(
            "back buffer",
            ResourceDesc::TextureBuffer(self.back_buffer.desc.clone()),
            self.graph.next_sequence,
        );
        self.graph.next_sequence += 1;
        entry.imported = Some(self.back_buffer.texture.into_object());
        let resource = FrameGraphResource::new(self.graph.resources.insert(entry));
        self.graph.back_buffer = Some(resource);
        resource
    }

    pub fn back_buffer_desc(&self) -> &TextureBufferDesc {
        &self.back_buffer.desc
    }

    /// Back buffer size scaled by the configured render scale
    pub fn render_resolution(&self) -> Extent2d {
        self.back_buffer.desc.size.scaled(self.settings.render_scale)
    }

    pub fn settings(&self) -> &'a FrameGraphSettings {
        self.settings
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    pub fn frame_index(&self) -> u64 {
        self.graph.frame_index
    }

    /// Whether the handle refers to a live resource of this graph.
    ///
    /// Passes use this to recreate persisted resources whose handle went
    /// stale, e.g. after a discarded frame.
    pub fn contains(&self, resource: FrameGraphResource) -> bool {
        self.graph.resource(resource).is_some()
    }

    /// Descriptor of a resource declared in this graph
    pub fn desc(&self, resource: FrameGraphResource) -> GraphResult<&ResourceDesc> {
        Ok(&self.graph.validate(resource, "desc")?.desc)
    }
}

/// Record one pass into `graph` with default settings and an 800x600 back buffer
#[cfg(test)]
pub(crate) fn record_pass<R>(
    graph: &mut FrameGraph,
    name: &str,
    f: impl FnOnce(&mut FrameGraphBuilder) -> R,
) -> R {
    let settings = FrameGraphSettings::default();
    let scene = Scene::default();
    let back_buffer = BackBuffer {
        texture: crate::backend::traits::TextureBufferHandle::from_raw(0),
        desc: TextureBufferDesc::attachment(Extent2d::new(800, 600), TextureFormat::Bgra8Unorm),
    };
    let pass = graph.begin_pass(name);
    let mut builder = FrameGraphBuilder::new(graph, pass, &settings, &scene, &back_buffer);
    f(&mut builder)
}
