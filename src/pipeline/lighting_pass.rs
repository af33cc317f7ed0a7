//! Deferred lighting pass
//!
//! Fullscreen pass shading the geometry buffer with every scene light.
//! Lights are uploaded as six storage buffers, point, directional and spot
//! lights each split into shadowed and unshadowed. Point light shadows are
//! sampled from the shadow map slot when a shadow pass published one, or
//! from an empty placeholder array otherwise.

use std::any::Any;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::backend::command::{Command, CommandBuffer, DrawCall, FilterMode, ShaderBinding};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::pipeline::common::{
    declare_pipeline, upload_storage, FullscreenQuad, PassTarget, Persistent, QUAD_VERTEX_COUNT,
};
use crate::render_graph::*;

/// Per-frame constants of the lighting shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingShaderData {
    pub view_position: Vec4,
    /// x = point light shadows enabled
    pub enable_shadows: [i32; 4],
}

/// Deferred lighting pass
#[derive(Debug, Default)]
pub struct DeferredLightingPass {
    pipeline: Persistent,
    quad: FullscreenQuad,
    target: PassTarget,
    /// Placeholder bound when no shadow map was rendered this frame
    empty_shadow_map: Persistent,
    gbuffer: Vec<FrameGraphResource>,
    shadow_map: FrameGraphResource,
    color: FrameGraphResource,
    depth: FrameGraphResource,
    shader_data: FrameGraphResource,
    light_buffers: Vec<FrameGraphResource>,
}

impl DeferredLightingPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn pipeline_desc() -> RenderPipelineDesc {
        let mut bindings = vec![BindingType::ShaderStorageBuffer];
        bindings.extend([BindingType::TextureBuffer; 7]);
        bindings.push(BindingType::TextureArrayBuffer);
        bindings.extend([BindingType::ShaderStorageBuffer; 6]);
        RenderPipelineDesc {
            shaders: vec![
                ShaderSource::vertex("deferred_lighting"),
                ShaderSource::fragment("deferred_lighting"),
            ],
            bindings,
            vertex_layout: Some(Vertex::layout()),
            depth_test: Some(DepthTest::default()),
            ..Default::default()
        }
    }
}

impl FrameGraphPass for DeferredLightingPass {
    fn name(&self) -> &str {
        "Deferred Lighting Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let scene = builder.scene();
        let resolution = builder.render_resolution();

        declare_pipeline(
            builder,
            &mut self.pipeline,
            "deferred lighting pipeline",
            Self::pipeline_desc(),
        )?;
        self.quad.declare(builder, "deferred lighting quad")?;
        self.target.declare(builder, "deferred lighting", resolution, 1, true)?;

        self.gbuffer.clear();
        for slot in FrameGraphSlot::GBUFFER {
            let texture = builder.get_slot(slot);
            builder.read(texture)?;
            self.gbuffer.push(texture);
        }

        let shadows = builder.check_slot(FrameGraphSlot::ShadowMapPoint);
        self.shadow_map = if shadows {
            let shadow_map = builder.get_slot(FrameGraphSlot::ShadowMapPoint);
            builder.read(shadow_map)?;
            shadow_map
        } else {
            self.empty_shadow_map.declare(
                builder,
                "empty point shadow maps",
                ResourceDesc::TextureArrayBuffer(TextureArrayBufferDesc {
                    layers: 6,
                    format: TextureFormat::Depth32Float,
                    texture_type: TextureType::CubeMap,
                    ..Default::default()
                }),
            )?;
            self.empty_shadow_map.handle()
        };

        self.color = builder.get_slot(FrameGraphSlot::DeferredColor);
        self.depth = builder.get_slot(FrameGraphSlot::DeferredDepth);
        for texture in [self.color, self.depth] {
            builder.read(texture)?;
            builder.write(texture)?;
        }

        let shader_data = LightingShaderData {
            view_position: scene.camera.position.extend(1.0),
            enable_shadows: [shadows as i32, 0, 0, 0],
        };
        self.shader_data = upload_storage(builder, "lighting shader data", vec![shader_data])?;

        let lights = scene.light_buffers();
        self.light_buffers.clear();
        for (name, list) in lights.lists() {
            let buffer = upload_storage(builder, name, list.to_vec())?;
            self.light_buffers.push(buffer);
        }
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let stage = ShaderStage::Fragment;
        let mut bindings = vec![ShaderBinding::read(0, resources.object(self.shader_data)?, stage)];
        for &texture in self.gbuffer.iter().chain([&self.shadow_map]) {
            let binding = bindings.len() as u32;
            bindings.push(ShaderBinding::read(binding, resources.object(texture)?, stage));
        }
        for &buffer in &self.light_buffers {
            let binding = bindings.len() as u32;
            bindings.push(ShaderBinding::read(binding, resources.object(buffer)?, stage));
        }

        let mut cmd = CommandBuffer::begin(self.name());
        if let Some(&gbuffer_depth) = self.gbuffer.last() {
            cmd.add(Command::Blit {
                source: resources.get(gbuffer_depth)?,
                target: resources.get(self.depth)?,
                filter: FilterMode::Nearest,
            });
        }
        self.target
            .begin(resources, &mut cmd, &[self.color], Some(self.depth), None)?;
        cmd.add(Command::BindPipeline(resources.get(self.pipeline.handle())?));
        self.quad.bind(resources, &mut cmd)?;
        cmd.add(Command::BindShaderResources(bindings))
            .add(Command::DrawArray(DrawCall::new(QUAD_VERTEX_COUNT)))
            .add(Command::EndPass);

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
