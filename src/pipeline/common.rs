//! Building blocks shared by the pipeline passes

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytemuck::Pod;

use crate::backend::command::{ClearValues, Command, CommandBuffer, DrawCall};
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::render_graph::{
    FrameGraphBuilder, FrameGraphPassResources, FrameGraphResource, ResourceDesc, UploadBuffer,
};
use crate::scene::Mesh;

/// A resource a pass keeps alive across frames
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Persistent(FrameGraphResource);

impl Persistent {
    pub fn handle(&self) -> FrameGraphResource {
        self.0
    }

    /// Declare the resource as persisted and read by the current pass.
    ///
    /// The resource is created when the handle is unassigned or went stale,
    /// and redeclared when `desc` differs from its current descriptor.
    /// Returns true when its contents have to be written again.
    pub fn declare(
        &mut self,
        builder: &mut FrameGraphBuilder,
        name: &str,
        desc: ResourceDesc,
    ) -> GraphResult<bool> {
        let fresh = if !builder.contains(self.0) {
            self.0 = builder.create_resource(name, desc);
            true
        } else if *builder.desc(self.0)? != desc {
            builder.redeclare(self.0, desc)?;
            true
        } else {
            false
        };
        builder.persist(self.0)?;
        builder.read(self.0)?;
        Ok(fresh)
    }
}

/// Persisted pipeline object
pub(crate) fn declare_pipeline(
    builder: &mut FrameGraphBuilder,
    pipeline: &mut Persistent,
    name: &str,
    desc: RenderPipelineDesc,
) -> GraphResult<()> {
    pipeline.declare(builder, name, ResourceDesc::RenderPipeline(desc))?;
    Ok(())
}

/// Transient buffer holding `value`, uploaded when the frame executes
pub(crate) fn upload_uniform<T: Pod + Send + Sync>(
    builder: &mut FrameGraphBuilder,
    name: &str,
    value: T,
) -> GraphResult<FrameGraphResource> {
    let size = std::mem::size_of::<T>() as u64;
    let buffer = builder.create_uniform_buffer(name, UniformBufferDesc::new(size));
    builder.upload(buffer, move || UploadBuffer::from_value(&value))?;
    builder.read(buffer)?;
    Ok(buffer)
}

/// Transient storage buffer holding `values`.
///
/// Never empty: a single zeroed element stands in for an empty list.
pub(crate) fn upload_storage<T: Pod + Send + Sync>(
    builder: &mut FrameGraphBuilder,
    name: &str,
    mut values: Vec<T>,
) -> GraphResult<FrameGraphResource> {
    if values.is_empty() {
        values.push(T::zeroed());
    }
    let size = (values.len() * std::mem::size_of::<T>()) as u64;
    let buffer = builder.create_shader_storage_buffer(name, ShaderStorageBufferDesc::new(size));
    builder.upload(buffer, move || UploadBuffer::from_slice(&values))?;
    builder.read(buffer)?;
    Ok(buffer)
}

pub(crate) const QUAD_VERTEX_COUNT: u32 = 6;

/// Persisted vertex buffer with the fullscreen quad, uploaded once
#[derive(Debug, Default)]
pub(crate) struct FullscreenQuad {
    buffer: Persistent,
}

impl FullscreenQuad {
    pub fn declare(&mut self, builder: &mut FrameGraphBuilder, name: &str) -> GraphResult<()> {
        let size = std::mem::size_of::<[Vertex; 6]>() as u64;
        let desc = ResourceDesc::VertexBuffer(VertexBufferDesc::new(size));
        if self.buffer.declare(builder, name, desc)? {
            builder.upload(self.buffer.handle(), || {
                UploadBuffer::from_slice(&fullscreen_quad())
            })?;
        }
        Ok(())
    }

    pub fn bind(&self, resources: &FrameGraphPassResources, cmd: &mut CommandBuffer) -> GraphResult<()> {
        cmd.add(Command::BindVertexBuffer(resources.get(self.buffer.handle())?));
        Ok(())
    }
}

/// Render pass object and per-frame render target of a pass drawing into attachments
#[derive(Debug, Default)]
pub(crate) struct PassTarget {
    render_pass: Persistent,
    target: FrameGraphResource,
    size: Extent2d,
}

impl PassTarget {
    pub fn declare(
        &mut self,
        builder: &mut FrameGraphBuilder,
        name: &str,
        size: Extent2d,
        color_attachments: u32,
        has_depth_stencil: bool,
    ) -> GraphResult<()> {
        let pass_desc = RenderPassDesc {
            color_attachments,
            has_depth_stencil,
        };
        self.render_pass.declare(
            builder,
            &format!("{} render pass", name),
            ResourceDesc::RenderPass(pass_desc),
        )?;
        self.target = builder.create_render_target(
            &format!("{} target", name),
            RenderTargetDesc::new(size, color_attachments, has_depth_stencil),
        );
        self.size = size;
        builder.write(self.target)
    }

    /// Begin rendering into the given attachments and set the viewport
    pub fn begin(
        &self,
        resources: &FrameGraphPassResources,
        cmd: &mut CommandBuffer,
        colors: &[FrameGraphResource],
        depth: Option<FrameGraphResource>,
        clear: Option<ClearValues>,
    ) -> GraphResult<()> {
        let color_attachments = colors
            .iter()
            .map(|&c| resources.get(c))
            .collect::<GraphResult<Vec<_>>>()?;
        let depth_attachment = depth.map(|d| resources.get(d)).transpose()?;
        cmd.add(Command::BeginPass {
            pass: resources.get(self.render_pass.handle())?,
            target: resources.get(self.target)?,
            color_attachments,
            depth_attachment,
            clear,
        })
        .add(self.viewport());
        Ok(())
    }

    /// Begin rendering into one depth layer of a texture array
    pub fn begin_layer(
        &self,
        resources: &FrameGraphPassResources,
        cmd: &mut CommandBuffer,
        depth: FrameGraphResource,
        layer: u32,
    ) -> GraphResult<()> {
        cmd.add(Command::BeginLayerPass {
            pass: resources.get(self.render_pass.handle())?,
            target: resources.get(self.target)?,
            depth_attachment: resources.get(depth)?,
            layer,
            clear: Some(ClearValues {
                color: None,
                depth: Some(1.0),
            }),
        })
        .add(self.viewport());
        Ok(())
    }

    fn viewport(&self) -> Command {
        Command::SetViewport {
            x: 0,
            y: 0,
            size: self.size,
        }
    }
}

#[derive(Debug, Default)]
struct MeshEntry {
    vertices: Persistent,
    indices: Persistent,
    index_count: u32,
}

/// Persisted vertex and index buffers of the meshes a pass draws.
///
/// Buffers are uploaded when first declared and again only when a mesh
/// changes size. Meshes no longer drawn are forgotten and their buffers go
/// back to the pool.
#[derive(Debug, Default)]
pub(crate) struct MeshBuffers {
    entries: HashMap<String, MeshEntry>,
}

impl MeshBuffers {
    pub fn declare<'m>(
        &mut self,
        builder: &mut FrameGraphBuilder,
        meshes: impl IntoIterator<Item = &'m Arc<Mesh>>,
    ) -> GraphResult<()> {
        let mut used = HashSet::new();
        for mesh in meshes {
            if !used.insert(mesh.name.clone()) {
                continue;
            }
            let entry = self.entries.entry(mesh.name.clone()).or_default();

            let desc = ResourceDesc::VertexBuffer(VertexBufferDesc::new(mesh.vertex_bytes()));
            let name = format!("{} vertices", mesh.name);
            if entry.vertices.declare(builder, &name, desc)? {
                let mesh = Arc::clone(mesh);
                builder.upload(entry.vertices.handle(), move || {
                    UploadBuffer::from_slice(&mesh.vertices)
                })?;
            }

            let count = mesh.indices.len() as u64;
            let desc = ResourceDesc::IndexBuffer(IndexBufferDesc::new(count, IndexFormat::Uint32));
            let name = format!("{} indices", mesh.name);
            if entry.indices.declare(builder, &name, desc)? {
                let mesh = Arc::clone(mesh);
                builder.upload(entry.indices.handle(), move || {
                    UploadBuffer::from_slice(&mesh.indices)
                })?;
            }
            entry.index_count = mesh.indices.len() as u32;
        }
        self.entries.retain(|name, _| used.contains(name));
        Ok(())
    }

    /// Record an indexed draw of `mesh`; `object` selects the per-object data
    pub fn draw(
        &self,
        resources: &FrameGraphPassResources,
        cmd: &mut CommandBuffer,
        mesh: &Mesh,
        object: u32,
    ) -> GraphResult<()> {
        let Some(entry) = self.entries.get(&mesh.name) else {
            return Ok(());
        };
        cmd.add(Command::BindVertexBuffer(resources.get(entry.vertices.handle())?))
            .add(Command::BindIndexBuffer(resources.get(entry.indices.handle())?))
            .add(Command::DrawIndexed(
                DrawCall::new(entry.index_count).with_base_instance(object),
            ));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
