//! Scene description consumed by the pipeline passes
//!
//! The scene is plain data handed to [`crate::Engine::render_frame`]. Passes
//! read it during setup to size their buffers and during execute to record
//! draws.

mod camera;
mod light;

pub use camera::*;
pub use light::*;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::backend::types::Vertex;

/// Object placement in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Unique name, used to keep the mesh's GPU buffers across frames
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: &str, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.to_string(),
            vertices,
            indices,
        }
    }

    /// Axis aligned unit cube centered at the origin
    pub fn cube(name: &str) -> Self {
        let corners = [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let vertices = corners
            .iter()
            .map(|&p| Vertex {
                position: p,
                normal: p.normalize(),
                uv: glam::Vec2::new(p.x + 0.5, p.y + 0.5),
                tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
            })
            .collect();
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
            3, 7, 6, 3, 6, 2, // top
            0, 1, 5, 0, 5, 4, // bottom
        ];
        Self::new(name, vertices, indices)
    }

    pub fn vertex_bytes(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()) as u64
    }
}

/// A renderable object in the scene
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub mesh: Arc<Mesh>,
    pub transform: Transform,
    pub albedo: Vec4,
    /// Drawn by the forward pass instead of the geometry buffer pass
    pub transparent: bool,
    pub casts_shadows: bool,
}

impl RenderObject {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            transform: Transform::default(),
            albedo: Vec4::ONE,
            transparent: false,
            casts_shadows: true,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_albedo(mut self, albedo: Vec4) -> Self {
        self.albedo = albedo;
        self.transparent = albedo.w < 1.0;
        self
    }

    pub fn uniform_data(&self) -> ObjectUniformData {
        let model = self.transform.matrix();
        ObjectUniformData {
            model,
            normal: model.inverse().transpose(),
            albedo: self.albedo,
        }
    }
}

/// Per-object uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniformData {
    pub model: Mat4,
    pub normal: Mat4,
    pub albedo: Vec4,
}

/// The scene containing all renderable content
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub lights: Vec<Light>,
    pub objects: Vec<RenderObject>,
    pub ambient_light: Vec3,
    pub skybox_color: Vec4,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            lights: Vec::new(),
            objects: Vec::new(),
            ambient_light: Vec3::new(0.03, 0.03, 0.03),
            skybox_color: Vec4::new(0.1, 0.1, 0.12, 1.0),
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Add a render object to the scene
    pub fn add_object(&mut self, object: RenderObject) -> usize {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    pub fn opaque_objects(&self) -> impl Iterator<Item = &RenderObject> {
        self.objects.iter().filter(|o| !o.transparent)
    }

    pub fn transparent_objects(&self) -> impl Iterator<Item = &RenderObject> {
        self.objects.iter().filter(|o| o.transparent)
    }

    /// Point lights rendering a shadow map
    pub fn shadow_casting_point_lights(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter().filter_map(|l| match l {
            Light::Point(p) if p.casts_shadows => Some(p),
            _ => None,
        })
    }

    /// Light data grouped per light type, split by shadow casting
    pub fn light_buffers(&self) -> LightBuffers {
        let mut buffers = LightBuffers::default();
        for light in &self.lights {
            let data = light.to_gpu_data();
            let list = match (light, light.casts_shadows()) {
                (Light::Point(_), false) => &mut buffers.point,
                (Light::Point(_), true) => &mut buffers.shadow_point,
                (Light::Directional(_), false) => &mut buffers.directional,
                (Light::Directional(_), true) => &mut buffers.shadow_directional,
                (Light::Spot(_), false) => &mut buffers.spot,
                (Light::Spot(_), true) => &mut buffers.shadow_spot,
            };
            list.push(data);
        }
        buffers
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
