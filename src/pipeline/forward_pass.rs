//! Forward pass for transparent geometry
//!
//! Transparent objects are drawn with alpha blending into their own color
//! layer. The deferred depth is copied into the forward depth first so
//! transparent surfaces behind opaque ones are rejected.

use std::any::Any;
use std::sync::Arc;

use crate::backend::command::{Command, CommandBuffer, FilterMode, ShaderBinding};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::pipeline::common::{
    declare_pipeline, upload_storage, upload_uniform, MeshBuffers, PassTarget, Persistent,
};
use crate::render_graph::*;
use crate::scene::{Mesh, ObjectUniformData};

#[derive(Debug, Default)]
pub struct ForwardPass {
    pipeline: Persistent,
    meshes: MeshBuffers,
    target: PassTarget,
    deferred_depth: FrameGraphResource,
    color: FrameGraphResource,
    depth: FrameGraphResource,
    camera: FrameGraphResource,
    objects: FrameGraphResource,
    lights: FrameGraphResource,
    draws: Vec<(u32, Arc<Mesh>)>,
}

impl ForwardPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for ForwardPass {
    fn name(&self) -> &str {
        "Forward Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let scene = builder.scene();
        let resolution = builder.render_resolution();

        declare_pipeline(
            builder,
            &mut self.pipeline,
            "forward pipeline",
            RenderPipelineDesc {
                shaders: vec![ShaderSource::vertex("forward"), ShaderSource::fragment("forward")],
                bindings: vec![
                    BindingType::UniformBuffer,
                    BindingType::ShaderStorageBuffer,
                    BindingType::ShaderStorageBuffer,
                ],
                vertex_layout: Some(Vertex::layout()),
                cull_mode: CullMode::Back,
                depth_test: Some(DepthTest {
                    compare: CompareFunction::Less,
                    write: false,
                }),
                blend: Some(BlendState::alpha_blending()),
                ..Default::default()
            },
        )?;
        self.target.declare(builder, "forward", resolution, 1, true)?;

        self.deferred_depth = builder.get_slot(FrameGraphSlot::DeferredDepth);
        builder.read(self.deferred_depth)?;

        self.color = builder.get_slot(FrameGraphSlot::ForwardColor);
        self.depth = builder.get_slot(FrameGraphSlot::ForwardDepth);
        for texture in [self.color, self.depth] {
            builder.read(texture)?;
            builder.write(texture)?;
        }

        let aspect = resolution.width as f32 / resolution.height as f32;
        self.camera = upload_uniform(builder, "forward camera", scene.camera.uniform_data(aspect))?;
        let lights: Vec<_> = scene.lights.iter().map(|l| l.to_gpu_data()).collect();
        self.lights = upload_storage(builder, "forward lights", lights)?;

        self.draws.clear();
        let mut object_data = Vec::new();
        for object in scene.transparent_objects() {
            self.draws.push((object_data.len() as u32, object.mesh.clone()));
            object_data.push(object.uniform_data());
        }
        self.objects = upload_storage::<ObjectUniformData>(builder, "forward objects", object_data)?;

        self.meshes
            .declare(builder, scene.transparent_objects().map(|o| &o.mesh))?;
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let mut cmd = CommandBuffer::begin(self.name());
        cmd.add(Command::Blit {
            source: resources.get(self.deferred_depth)?,
            target: resources.get(self.depth)?,
            filter: FilterMode::Nearest,
        });
        self.target
            .begin(resources, &mut cmd, &[self.color], Some(self.depth), None)?;
        cmd.add(Command::BindPipeline(resources.get(self.pipeline.handle())?))
            .add(Command::BindShaderResources(vec![
                ShaderBinding::read(0, resources.object(self.camera)?, ShaderStage::Vertex),
                ShaderBinding::read(1, resources.object(self.objects)?, ShaderStage::Vertex),
                ShaderBinding::read(2, resources.object(self.lights)?, ShaderStage::Fragment),
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
