//! Point light shadow mapping
//!
//! Renders the depth of every shadow casting object into one cube (six
//! layers) per shadow casting point light. The resulting texture array is
//! published as [`FrameGraphSlot::ShadowMapPoint`]. Nothing is declared when
//! the scene has no shadow casting point light.

use std::any::Any;
use std::sync::Arc;

use glam::Mat4;

use crate::backend::command::{Command, CommandBuffer, ShaderBinding};
use crate::backend::traits::QueueKind;
use crate::backend::types::*;
use crate::error::GraphResult;
use crate::pipeline::common::{
    declare_pipeline, upload_storage, MeshBuffers, PassTarget, Persistent,
};
use crate::render_graph::*;
use crate::scene::{cube_face_view_projections, Mesh, ObjectUniformData};

const SHADOW_NEAR_PLANE: f32 = 0.1;

/// Point light shadow map pass
#[derive(Debug, Default)]
pub struct ShadowMappingPass {
    pipeline: Persistent,
    meshes: MeshBuffers,
    target: PassTarget,
    shadow_map: FrameGraphResource,
    face_matrices: FrameGraphResource,
    objects: FrameGraphResource,
    lights: u32,
    /// (object index, mesh) of every shadow caster
    casters: Vec<(u32, Arc<Mesh>)>,
}

impl ShadowMappingPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for ShadowMappingPass {
    fn name(&self) -> &str {
        "Shadow Mapping Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        let scene = builder.scene();
        let lights: Vec<_> = scene.shadow_casting_point_lights().copied().collect();
        self.lights = lights.len() as u32;
        self.casters.clear();
        if lights.is_empty() {
            return Ok(());
        }

        let resolution = builder.settings().shadow_map_resolution;
        let size = Extent2d::new(resolution, resolution);

        declare_pipeline(
            builder,
            &mut self.pipeline,
            "shadow mapping pipeline",
            RenderPipelineDesc {
                shaders: vec![
                    ShaderSource::vertex("shadow_mapping_point"),
                    ShaderSource::fragment("shadow_mapping_point"),
                ],
                bindings: vec![BindingType::ShaderStorageBuffer, BindingType::ShaderStorageBuffer],
                vertex_layout: Some(Vertex::layout()),
                cull_mode: CullMode::Front,
                depth_test: Some(DepthTest::default()),
                color_targets: 0,
                ..Default::default()
            },
        )?;
        self.target.declare(builder, "shadow mapping", size, 0, true)?;

        self.shadow_map = builder.create_texture_array_buffer(
            "point shadow maps",
            TextureArrayBufferDesc {
                size,
                layers: self.lights * 6,
                format: TextureFormat::Depth32Float,
                texture_type: TextureType::CubeMap,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            },
        );
        builder.write(self.shadow_map)?;
        builder.assign_slot(FrameGraphSlot::ShadowMapPoint, self.shadow_map)?;

        let matrices: Vec<Mat4> = lights
            .iter()
            .flat_map(|light| {
                cube_face_view_projections(light.position, SHADOW_NEAR_PLANE, light.radius)
            })
            .collect();
        self.face_matrices = upload_storage(builder, "shadow face matrices", matrices)?;

        let mut object_data = Vec::new();
        for object in scene.objects.iter().filter(|o| o.casts_shadows) {
            self.casters.push((object_data.len() as u32, object.mesh.clone()));
            object_data.push(object.uniform_data());
        }
        self.objects =
            upload_storage::<ObjectUniformData>(builder, "shadow caster objects", object_data)?;

        self.meshes.declare(
            builder,
            scene
                .objects
                .iter()
                .filter(|o| o.casts_shadows)
                .map(|o| &o.mesh),
        )?;
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        if self.lights == 0 {
            return Ok(());
        }

        let mut cmd = CommandBuffer::begin(self.name());
        let bindings = vec![
            ShaderBinding::read(0, resources.object(self.face_matrices)?, ShaderStage::Vertex),
            ShaderBinding::read(1, resources.object(self.objects)?, ShaderStage::Vertex),
        ];
        for layer in 0..self.lights * 6 {
            self.target
                .begin_layer(resources, &mut cmd, self.shadow_map, layer)?;
            cmd.add(Command::BindPipeline(resources.get(self.pipeline.handle())?))
                .add(Command::BindShaderResources(bindings.clone()));
            for (index, mesh) in &self.casters {
                self.meshes.draw(resources, &mut cmd, mesh, *index)?;
            }
            cmd.add(Command::EndPass);
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
