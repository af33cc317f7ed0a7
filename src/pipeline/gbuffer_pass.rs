//! G-Buffer generation pass for deferred rendering
//!
//! Renders opaque geometry to multiple render targets (MRT):
//! - World-space position
//! - World-space normal and tangent
//! - Roughness, metallic and ambient occlusion
//! - Albedo (base color)
//! - Object id and shadow receiving flags
//! - Depth buffer

use std::any::Any;
use std::sync::Arc;

use crate::backend::command::{Command, CommandBuffer, ShaderBinding};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::pipeline::common::{
    declare_pipeline, upload_storage, upload_uniform, MeshBuffers, PassTarget, Persistent,
};
use crate::render_graph::*;
use crate::scene::{Mesh, ObjectUniformData};

/// G-Buffer generation pass for deferred rendering
#[derive(Debug, Default)]
pub struct GBufferPass {
    pipeline: Persistent,
    meshes: MeshBuffers,
    target: PassTarget,
    /// Textures of the geometry buffer slots, in attachment order
    gbuffer: Vec<FrameGraphResource>,
    camera: FrameGraphResource,
    objects: FrameGraphResource,
    draws: Vec<(u32, Arc<Mesh>)>,
}

impl GBufferPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct meshes with uploaded buffers
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

impl FrameGraphPass for GBufferPass {
    fn name(&self) -> &str {
        "G-Buffer Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let scene = builder.scene();
        let resolution = builder.render_resolution();

        declare_pipeline(
            builder,
            &mut self.pipeline,
            "gbuffer pipeline",
            RenderPipelineDesc {
                shaders: vec![ShaderSource::vertex("gbuffer"), ShaderSource::fragment("gbuffer")],
                bindings: vec![BindingType::UniformBuffer, BindingType::ShaderStorageBuffer],
                vertex_layout: Some(Vertex::layout()),
                cull_mode: CullMode::Back,
                depth_test: Some(DepthTest::default()),
                color_targets: 6,
                ..Default::default()
            },
        )?;
        self.target.declare(builder, "gbuffer", resolution, 6, true)?;

        self.gbuffer.clear();
        for slot in FrameGraphSlot::GBUFFER {
            let texture = builder.get_slot(slot);
            builder.read(texture)?;
            builder.write(texture)?;
            self.gbuffer.push(texture);
        }

        let aspect = resolution.width as f32 / resolution.height as f32;
        self.camera = upload_uniform(builder, "gbuffer camera", scene.camera.uniform_data(aspect))?;

        self.draws.clear();
        let mut object_data = Vec::new();
        for object in scene.opaque_objects() {
            self.draws.push((object_data.len() as u32, object.mesh.clone()));
            object_data.push(object.uniform_data());
        }
        self.objects = upload_storage::<ObjectUniformData>(builder, "gbuffer objects", object_data)?;

        self.meshes
            .declare(builder, scene.opaque_objects().map(|o| &o.mesh))?;
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let Some((&depth, colors)) = self.gbuffer.split_last() else {
            return Ok(());
        };

        let mut cmd = CommandBuffer::begin(self.name());
        self.target
            .begin(resources, &mut cmd, colors, Some(depth), None)?;
        cmd.add(Command::BindPipeline(resources.get(self.pipeline.handle())?))
            .add(Command::BindShaderResources(vec![
                ShaderBinding::read(0, resources.object(self.camera)?, ShaderStage::Vertex),
                ShaderBinding::read(1, resources.object(self.objects)?, ShaderStage::Vertex),
            ]));
        for (index, mesh) in &self.draws {
            self.meshes.draw(resources, &mut cmd, mesh, *index)?;
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
