//! Construction pass
//!
//! Creates the render-resolution textures every later pass draws into,
//! clears them and publishes them under their slots.

use std::any::Any;

use crate::backend::command::{Command, CommandBuffer};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::render_graph::*;

/// Format of the texture published under each slot
const LAYERS: [(FrameGraphSlot, TextureFormat); 14] = [
    (FrameGraphSlot::GBufferPosition, TextureFormat::Rgba32Float),
    (FrameGraphSlot::GBufferNormal, TextureFormat::Rgba32Float),
    (FrameGraphSlot::GBufferTangent, TextureFormat::Rgba32Float),
    (FrameGraphSlot::GBufferRoughnessMetallicAo, TextureFormat::Rgba32Float),
    (FrameGraphSlot::GBufferAlbedo, TextureFormat::Rgba8Unorm),
    (FrameGraphSlot::GBufferObjectShadows, TextureFormat::Rgba32Sint),
    (FrameGraphSlot::GBufferDepth, TextureFormat::Depth24PlusStencil8),
    (FrameGraphSlot::DeferredColor, TextureFormat::Rgba8Unorm),
    (FrameGraphSlot::DeferredDepth, TextureFormat::Depth24PlusStencil8),
    (FrameGraphSlot::ForwardColor, TextureFormat::Rgba8Unorm),
    (FrameGraphSlot::ForwardDepth, TextureFormat::Depth24PlusStencil8),
    (FrameGraphSlot::BackgroundColor, TextureFormat::Rgba8Unorm),
    (FrameGraphSlot::ScreenColor, TextureFormat::Rgba8Unorm),
    (FrameGraphSlot::ScreenDepth, TextureFormat::Depth24PlusStencil8),
];

/// Creates and clears the shared frame textures
#[derive(Debug, Default)]
pub struct ConstructionPass {
    textures: Vec<(FrameGraphResource, TextureFormat)>,
}

impl ConstructionPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for ConstructionPass {
    fn name(&self) -> &str {
        "Construction Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let resolution = builder.render_resolution();
        self.textures.clear();
        for (slot, format) in LAYERS {
            let texture = builder.create_texture_buffer(
                &format!("{:?}", slot),
                TextureBufferDesc::attachment(resolution, format),
            );
            builder.write(texture)?;
            builder.assign_slot(slot, texture)?;
            self.textures.push((texture, format));
        }
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let mut cmd = CommandBuffer::begin(self.name());
        for &(texture, format) in &self.textures {
            let target = resources.get(texture)?;
            if format.is_depth() {
                cmd.add(Command::ClearDepth { target, depth: 1.0 });
            } else {
                cmd.add(Command::ClearColor {
                    target,
                    color: [0.0, 0.0, 0.0, 0.0],
                });
            }
        }
        output.submit(QueueKind::Render, cmd.end());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
