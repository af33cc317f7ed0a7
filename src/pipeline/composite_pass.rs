//! Composite pass
//!
//! Copies the background into the screen color, then blends the deferred
//! and forward layers on top, each with its own depth.

use std::any::Any;

use crate::backend::command::{Command, CommandBuffer, DrawCall, FilterMode, ShaderBinding};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::pipeline::common::{
    declare_pipeline, FullscreenQuad, PassTarget, Persistent, QUAD_VERTEX_COUNT,
};
use crate::render_graph::*;

/// Layers blended over the background, bottom first
const LAYERS: [(FrameGraphSlot, FrameGraphSlot); 2] = [
    (FrameGraphSlot::DeferredColor, FrameGraphSlot::DeferredDepth),
    (FrameGraphSlot::ForwardColor, FrameGraphSlot::ForwardDepth),
];

#[derive(Debug, Default)]
pub struct CompositePass {
    pipeline: Persistent,
    quad: FullscreenQuad,
    target: PassTarget,
    background: FrameGraphResource,
    screen_color: FrameGraphResource,
    screen_depth: FrameGraphResource,
    layers: Vec<(FrameGraphResource, FrameGraphResource)>,
}

impl CompositePass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for CompositePass {
    fn name(&self) -> &str {
        "Composite Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let resolution = builder.render_resolution();

        declare_pipeline(
            builder,
            &mut self.pipeline,
            "composite pipeline",
            RenderPipelineDesc {
                shaders: vec![
                    ShaderSource::vertex("composite"),
                    ShaderSource::fragment("composite"),
                ],
                bindings: vec![BindingType::TextureBuffer, BindingType::TextureBuffer],
                vertex_layout: Some(Vertex::layout()),
                depth_test: Some(DepthTest::default()),
                blend: Some(BlendState::alpha_blending()),
                ..Default::default()
            },
        )?;
        self.quad.declare(builder, "composite quad")?;
        self.target.declare(builder, "composite", resolution, 1, true)?;

        self.background = builder.get_slot(FrameGraphSlot::BackgroundColor);
        builder.read(self.background)?;

        self.layers.clear();
        for (color_slot, depth_slot) in LAYERS {
            if !builder.check_slot(color_slot) || !builder.check_slot(depth_slot) {
                continue;
            }
            let color = builder.get_slot(color_slot);
            let depth = builder.get_slot(depth_slot);
            builder.read(color)?;
            builder.read(depth)?;
            self.layers.push((color, depth));
        }

        self.screen_color = builder.get_slot(FrameGraphSlot::ScreenColor);
        self.screen_depth = builder.get_slot(FrameGraphSlot::ScreenDepth);
        for texture in [self.screen_color, self.screen_depth] {
            builder.read(texture)?;
            builder.write(texture)?;
        }
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let mut cmd = CommandBuffer::begin(self.name());
        cmd.add(Command::Blit {
            source: resources.get(self.background)?,
            target: resources.get(self.screen_color)?,
            filter: FilterMode::Nearest,
        });

        self.target.begin(
            resources,
            &mut cmd,
            &[self.screen_color],
            Some(self.screen_depth),
            None,
        )?;
        cmd.add(Command::BindPipeline(resources.get(self.pipeline.handle())?));
        self.quad.bind(resources, &mut cmd)?;
        for &(color, depth) in &self.layers {
            cmd.add(Command::BindShaderResources(vec![
                ShaderBinding::read(0, resources.object(color)?, ShaderStage::Fragment),
                ShaderBinding::read(1, resources.object(depth)?, ShaderStage::Fragment),
            ]))
            .add(Command::DrawArray(DrawCall::new(QUAD_VERTEX_COUNT)));
        }
        cmd.add(Command::EndPass);

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
