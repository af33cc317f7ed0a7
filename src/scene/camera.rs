//! Viewer camera

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Perspective camera looking at a target point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// Build camera uniform data for a target of the given aspect ratio
    pub fn uniform_data(&self, aspect: f32) -> CameraUniformData {
        let view = self.view_matrix();
        let proj = self.projection_matrix(aspect);
        let view_proj = proj * view;

        CameraUniformData {
            view_proj,
            inv_view_proj: view_proj.inverse(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(self.near, self.far, 0.0, 0.0),
        }
    }
}

/// View-projection matrices of the six cube faces around a point.
///
/// Face order is +X, -X, +Y, -Y, +Z, -Z.
pub fn cube_face_view_projections(position: Vec3, near: f32, far: f32) -> [Mat4; 6] {
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
    let faces = [
        (Vec3::X, -Vec3::Y),
        (-Vec3::X, -Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (-Vec3::Y, -Vec3::Z),
        (Vec3::Z, -Vec3::Y),
        (-Vec3::Z, -Vec3::Y),
    ];
    faces.map(|(dir, up)| proj * Mat4::look_at_rh(position, position + dir, up))
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub position: Vec4,
    pub near_far: Vec4,
}
