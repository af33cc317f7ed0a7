//! Frame graph resources

use crate::backend::traits::*;
use crate::backend::types::*;
use slotmap::new_key_type;

pub use crate::backend::traits::ResourceKind;

new_key_type! {
    /// Generational key of a resource entry in the frame graph
    pub struct ResourceKey;
}

/// Handle to a logical resource of the frame graph.
///
/// The default value is unassigned. Handles returned by the builder are
/// assigned and carry a generation, so a handle whose resource was released
/// in an earlier frame is detected instead of silently reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameGraphResource {
    key: ResourceKey,
    assigned: bool,
}

impl FrameGraphResource {
    pub(crate) fn new(key: ResourceKey) -> Self {
        Self {
            key,
            assigned: true,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned
    }

    pub(crate) fn key(&self) -> ResourceKey {
        self.key
    }
}

/// Descriptor of any frame graph resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceDesc {
    VertexBuffer(VertexBufferDesc),
    IndexBuffer(IndexBufferDesc),
    UniformBuffer(UniformBufferDesc),
    ShaderStorageBuffer(ShaderStorageBufferDesc),
    TextureBuffer(TextureBufferDesc),
    TextureArrayBuffer(TextureArrayBufferDesc),
    RenderTarget(RenderTargetDesc),
    RenderPass(RenderPassDesc),
    RenderPipeline(RenderPipelineDesc),
}

impl ResourceDesc {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDesc::VertexBuffer(_) => ResourceKind::VertexBuffer,
            ResourceDesc::IndexBuffer(_) => ResourceKind::IndexBuffer,
            ResourceDesc::UniformBuffer(_) => ResourceKind::UniformBuffer,
            ResourceDesc::ShaderStorageBuffer(_) => ResourceKind::ShaderStorageBuffer,
            ResourceDesc::TextureBuffer(_) => ResourceKind::TextureBuffer,
            ResourceDesc::TextureArrayBuffer(_) => ResourceKind::TextureArrayBuffer,
            ResourceDesc::RenderTarget(_) => ResourceKind::RenderTarget,
            ResourceDesc::RenderPass(_) => ResourceKind::RenderPass,
            ResourceDesc::RenderPipeline(_) => ResourceKind::RenderPipeline,
        }
    }

    /// Size and usage of buffer descriptors
    fn buffer_layout(&self) -> Option<(u64, BufferUsage)> {
        match self {
            ResourceDesc::VertexBuffer(d) => Some((d.size, d.usage)),
            ResourceDesc::IndexBuffer(d) => Some((d.size, d.usage)),
            ResourceDesc::UniformBuffer(d) => Some((d.size, d.usage)),
            ResourceDesc::ShaderStorageBuffer(d) => Some((d.size, d.usage)),
            _ => None,
        }
    }

    /// Whether a resource with this descriptor may live in a physical object
    /// created from `slot`.
    ///
    /// Equal descriptors are always compatible. A buffer may also use a
    /// larger buffer of the same kind and usage, as long as the unused
    /// fraction of the larger buffer stays within `max_waste`.
    pub fn alias_compatible(&self, slot: &ResourceDesc, max_waste: f32) -> bool {
        if self == slot {
            return true;
        }
        if self.kind() != slot.kind() {
            return false;
        }
        if let (ResourceDesc::IndexBuffer(a), ResourceDesc::IndexBuffer(b)) = (self, slot) {
            if a.format != b.format {
                return false;
            }
        }
        match (self.buffer_layout(), slot.buffer_layout()) {
            (Some((size, usage)), Some((slot_size, slot_usage))) => {
                usage == slot_usage
                    && size <= slot_size
                    && slot_size > 0
                    && ((slot_size - size) as f64 / slot_size as f64) <= max_waste as f64
            }
            _ => false,
        }
    }

    /// Bytes of `slot` left unused when this resource lives in it
    pub fn waste_in(&self, slot: &ResourceDesc) -> u64 {
        match (self.buffer_layout(), slot.buffer_layout()) {
            (Some((size, _)), Some((slot_size, _))) => slot_size.saturating_sub(size),
            _ => 0,
        }
    }

    /// Create the physical object described by this descriptor
    pub fn create<D: RenderDevice + ?Sized>(&self, device: &mut D) -> BackendResult<GpuObject> {
        let object = match self {
            ResourceDesc::VertexBuffer(d) => device.create_vertex_buffer(d)?.into_object(),
            ResourceDesc::IndexBuffer(d) => device.create_index_buffer(d)?.into_object(),
            ResourceDesc::UniformBuffer(d) => device.create_uniform_buffer(d)?.into_object(),
            ResourceDesc::ShaderStorageBuffer(d) => {
                device.create_shader_storage_buffer(d)?.into_object()
            }
            ResourceDesc::TextureBuffer(d) => device.create_texture_buffer(d)?.into_object(),
            ResourceDesc::TextureArrayBuffer(d) => {
                device.create_texture_array_buffer(d)?.into_object()
            }
            ResourceDesc::RenderTarget(d) => device.create_render_target(d)?.into_object(),
            ResourceDesc::RenderPass(d) => device.create_render_pass(d)?.into_object(),
            ResourceDesc::RenderPipeline(d) => device.create_render_pipeline(d)?.into_object(),
        };
        Ok(object)
    }
}

/// Where the physical object of a resource comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOrigin {
    /// Created this frame and released at its end
    Transient,
    /// Kept alive into the next frame
    Persisted,
    /// Persisted last frame and not persisted again yet
    Carried,
    /// Owned outside the frame graph (the back buffer)
    Imported,
}

/// A logical resource recorded in the frame graph
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub name: String,
    pub desc: ResourceDesc,
    pub(crate) sequence: u64,
    pub(crate) persist: bool,
    pub(crate) carried: bool,
    /// Descriptor the resource was carried in with
    pub(crate) carried_desc: Option<ResourceDesc>,
    pub(crate) imported: Option<GpuObject>,
}

impl ResourceEntry {
    pub(crate) fn new(name: &str, desc: ResourceDesc, sequence: u64) -> Self {
        Self {
            name: name.to_string(),
            desc,
            sequence,
            persist: false,
            carried: false,
            carried_desc: None,
            imported: None,
        }
    }

    pub fn origin(&self) -> ResourceOrigin {
        if self.imported.is_some() {
            ResourceOrigin::Imported
        } else if self.persist {
            ResourceOrigin::Persisted
        } else if self.carried {
            ResourceOrigin::Carried
        } else {
            ResourceOrigin::Transient
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.desc.kind()
    }
}
