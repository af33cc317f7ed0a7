//! Recorded GPU commands
//!
//! Passes never talk to the device directly during execution. They record
//! [`Command`]s into a [`CommandBuffer`] and hand the ended buffer to the
//! frame graph, which submits it in dependency order.

use crate::backend::traits::*;
use crate::backend::types::{Extent2d, ShaderStage};

/// How a bound shader resource is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderAccess {
    Read,
    Write,
    ReadWrite,
}

/// A resource bound to a shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBinding {
    pub binding: u32,
    pub object: GpuObject,
    pub stage: ShaderStage,
    pub access: ShaderAccess,
}

impl ShaderBinding {
    pub fn read(binding: u32, object: GpuObject, stage: ShaderStage) -> Self {
        Self {
            binding,
            object,
            stage,
            access: ShaderAccess::Read,
        }
    }
}

/// Clear operation applied to attachments when a pass begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

impl ClearValues {
    pub fn color_and_depth(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
        }
    }
}

/// Parameters of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub first: u32,
    pub count: u32,
    pub instances: u32,
    /// Index of the first instance, used by shaders to look up per-object data
    pub base_instance: u32,
}

impl DrawCall {
    pub fn new(count: u32) -> Self {
        Self {
            first: 0,
            count,
            instances: 1,
            base_instance: 0,
        }
    }

    pub fn with_base_instance(mut self, base_instance: u32) -> Self {
        self.base_instance = base_instance;
        self
    }
}

/// Texture filtering used by blits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// A single recorded GPU command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginPass {
        pass: RenderPassHandle,
        target: RenderTargetHandle,
        color_attachments: Vec<TextureBufferHandle>,
        depth_attachment: Option<TextureBufferHandle>,
        clear: Option<ClearValues>,
    },
    /// Render into one layer of a texture array, e.g. a shadow cube face
    BeginLayerPass {
        pass: RenderPassHandle,
        target: RenderTargetHandle,
        depth_attachment: TextureArrayBufferHandle,
        layer: u32,
        clear: Option<ClearValues>,
    },
    EndPass,
    SetViewport {
        x: u32,
        y: u32,
        size: Extent2d,
    },
    BindPipeline(RenderPipelineHandle),
    BindVertexBuffer(VertexBufferHandle),
    BindIndexBuffer(IndexBufferHandle),
    BindShaderResources(Vec<ShaderBinding>),
    DrawArray(DrawCall),
    DrawIndexed(DrawCall),
    ClearColor {
        target: TextureBufferHandle,
        color: [f32; 4],
    },
    ClearDepth {
        target: TextureBufferHandle,
        depth: f32,
    },
    Blit {
        source: TextureBufferHandle,
        target: TextureBufferHandle,
        filter: FilterMode,
    },
}

/// Command buffer being recorded
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    label: String,
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Start recording
    pub fn begin(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }

    pub fn add(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Finish recording. The returned buffer can no longer be modified.
    pub fn end(self) -> RecordedCommands {
        RecordedCommands {
            label: self.label,
            commands: self.commands,
        }
    }
}

/// An ended command buffer, ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommands {
    label: String,
    commands: Vec<Command>,
}

impl RecordedCommands {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawArray(_) | Command::DrawIndexed(_)))
            .count()
    }
}
