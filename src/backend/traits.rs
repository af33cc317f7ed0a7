//! Core backend abstraction traits
//!
//! The frame graph treats the graphics API as an opaque capability set: it
//! creates objects from descriptors, uploads bytes, destroys objects and
//! submits recorded command buffers. Everything else lives in the backend.

use crate::backend::command::RecordedCommands;
use crate::backend::types::*;
use std::fmt;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create {kind}: {reason}")]
    ResourceCreationFailed { kind: ResourceKind, reason: String },
    #[error("Failed to upload {len} bytes to {kind} object {id}: {reason}")]
    UploadFailed {
        kind: ResourceKind,
        id: u64,
        len: usize,
        reason: String,
    },
    #[error("Failed to submit to {queue:?} queue: {reason}")]
    SubmitFailed { queue: QueueKind, reason: String },
    #[error("Invalid {kind} object {id}")]
    InvalidObject { kind: ResourceKind, id: u64 },
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Kind of GPU object a frame graph resource stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    ShaderStorageBuffer,
    TextureBuffer,
    TextureArrayBuffer,
    RenderTarget,
    RenderPass,
    RenderPipeline,
}

impl ResourceKind {
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            ResourceKind::VertexBuffer
                | ResourceKind::IndexBuffer
                | ResourceKind::UniformBuffer
                | ResourceKind::ShaderStorageBuffer
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::VertexBuffer => "vertex buffer",
            ResourceKind::IndexBuffer => "index buffer",
            ResourceKind::UniformBuffer => "uniform buffer",
            ResourceKind::ShaderStorageBuffer => "shader storage buffer",
            ResourceKind::TextureBuffer => "texture buffer",
            ResourceKind::TextureArrayBuffer => "texture array buffer",
            ResourceKind::RenderTarget => "render target",
            ResourceKind::RenderPass => "render pass",
            ResourceKind::RenderPipeline => "render pipeline",
        };
        f.write_str(name)
    }
}

/// Typed handle to a backend object
pub trait GpuHandle: Copy + fmt::Debug {
    /// Kind of object this handle refers to
    const KIND: ResourceKind;

    /// Extract the typed handle from a type-erased object
    fn from_object(object: &GpuObject) -> Option<Self>;

    /// Erase the handle type
    fn into_object(self) -> GpuObject;
}

macro_rules! gpu_handles {
    ($($(#[$meta:meta])* $name:ident => $variant:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u64);

            impl $name {
                pub fn from_raw(id: u64) -> Self {
                    Self(id)
                }

                pub fn raw(&self) -> u64 {
                    self.0
                }
            }

            impl GpuHandle for $name {
                const KIND: ResourceKind = ResourceKind::$variant;

                fn from_object(object: &GpuObject) -> Option<Self> {
                    match object {
                        GpuObject::$variant(handle) => Some(*handle),
                        _ => None,
                    }
                }

                fn into_object(self) -> GpuObject {
                    GpuObject::$variant(self)
                }
            }
        )*

        /// Type-erased backend object, tagged by kind
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GpuObject {
            $($variant($name),)*
        }

        impl GpuObject {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(GpuObject::$variant(_) => ResourceKind::$variant,)*
                }
            }

            pub fn raw(&self) -> u64 {
                match self {
                    $(GpuObject::$variant(handle) => handle.raw(),)*
                }
            }
        }
    };
}

gpu_handles! {
    /// Handle to a GPU vertex buffer
    VertexBufferHandle => VertexBuffer,
    /// Handle to a GPU index buffer
    IndexBufferHandle => IndexBuffer,
    /// Handle to a GPU uniform buffer
    UniformBufferHandle => UniformBuffer,
    /// Handle to a GPU shader storage buffer
    ShaderStorageBufferHandle => ShaderStorageBuffer,
    /// Handle to a GPU texture
    TextureBufferHandle => TextureBuffer,
    /// Handle to a GPU texture array
    TextureArrayBufferHandle => TextureArrayBuffer,
    /// Handle to a render target (framebuffer)
    RenderTargetHandle => RenderTarget,
    /// Handle to a render pass object
    RenderPassHandle => RenderPass,
    /// Handle to a render pipeline
    RenderPipelineHandle => RenderPipeline,
}

/// Device queue families a command buffer can be submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueKind {
    Render,
    Compute,
    Transfer,
}

/// Queue families the device exposes besides the render queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCapabilities {
    pub compute: bool,
    pub transfer: bool,
}

impl QueueCapabilities {
    pub fn render_only() -> Self {
        Self {
            compute: false,
            transfer: false,
        }
    }

    pub fn supports(&self, queue: QueueKind) -> bool {
        match queue {
            QueueKind::Render => true,
            QueueKind::Compute => self.compute,
            QueueKind::Transfer => self.transfer,
        }
    }
}

impl Default for QueueCapabilities {
    fn default() -> Self {
        Self {
            compute: true,
            transfer: true,
        }
    }
}

/// The image the frame is presented from
#[derive(Debug, Clone)]
pub struct BackBuffer {
    pub texture: TextureBufferHandle,
    pub desc: TextureBufferDesc,
}

/// Main graphics device trait
pub trait RenderDevice {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Queue families available for submission
    fn queue_capabilities(&self) -> QueueCapabilities;

    /// The current back buffer
    fn back_buffer(&self) -> BackBuffer;

    // Resource creation

    fn create_vertex_buffer(&mut self, desc: &VertexBufferDesc)
        -> BackendResult<VertexBufferHandle>;

    fn create_index_buffer(&mut self, desc: &IndexBufferDesc) -> BackendResult<IndexBufferHandle>;

    fn create_uniform_buffer(
        &mut self,
        desc: &UniformBufferDesc,
    ) -> BackendResult<UniformBufferHandle>;

    fn create_shader_storage_buffer(
        &mut self,
        desc: &ShaderStorageBufferDesc,
    ) -> BackendResult<ShaderStorageBufferHandle>;

    fn create_texture_buffer(
        &mut self,
        desc: &TextureBufferDesc,
    ) -> BackendResult<TextureBufferHandle>;

    fn create_texture_array_buffer(
        &mut self,
        desc: &TextureArrayBufferDesc,
    ) -> BackendResult<TextureArrayBufferHandle>;

    fn create_render_target(&mut self, desc: &RenderTargetDesc)
        -> BackendResult<RenderTargetHandle>;

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> BackendResult<RenderPassHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDesc,
    ) -> BackendResult<RenderPipelineHandle>;

    /// Write bytes into a buffer or texture object
    fn upload(&mut self, object: GpuObject, data: &[u8]) -> BackendResult<()>;

    /// Destroy an object created by this device
    fn destroy(&mut self, object: GpuObject);

    /// Submit ended command buffers to a queue, in order
    fn submit(&mut self, queue: QueueKind, buffers: &[RecordedCommands]) -> BackendResult<()>;
}
