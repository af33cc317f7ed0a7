//! Light types for the scene

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Omnidirectional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    /// Renders a cube shadow map
    pub casts_shadows: bool,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            radius,
            casts_shadows: false,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }
}

/// Cone light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    /// Radians
    pub inner_angle: f32,
    /// Radians
    pub outer_angle: f32,
    pub casts_shadows: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: -Vec3::Y,
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
            inner_angle: 0.3,
            outer_angle: 0.5,
            casts_shadows: false,
        }
    }
}

/// Light at infinity, like the sun
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub casts_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
            casts_shadows: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Point(PointLight),
    Spot(SpotLight),
    Directional(DirectionalLight),
}

impl Light {
    pub fn casts_shadows(&self) -> bool {
        match self {
            Light::Point(l) => l.casts_shadows,
            Light::Spot(l) => l.casts_shadows,
            Light::Directional(l) => l.casts_shadows,
        }
    }

    /// Pack into the layout the lighting shaders read
    pub fn to_gpu_data(&self) -> GpuLightData {
        match self {
            Light::Point(l) => GpuLightData {
                position: l.position.extend(l.radius),
                color_intensity: l.color.extend(l.intensity),
                direction_type: Vec4::new(0.0, 0.0, 0.0, LIGHT_TYPE_POINT),
                spot_params: Vec4::ZERO,
            },
            Light::Spot(l) => GpuLightData {
                position: l.position.extend(l.radius),
                color_intensity: l.color.extend(l.intensity),
                direction_type: l.direction.normalize_or_zero().extend(LIGHT_TYPE_SPOT),
                spot_params: Vec4::new(l.inner_angle.cos(), l.outer_angle.cos(), 0.0, 0.0),
            },
            Light::Directional(l) => GpuLightData {
                position: Vec4::new(0.0, 0.0, 0.0, f32::INFINITY),
                color_intensity: l.color.extend(l.intensity),
                direction_type: l
                    .direction
                    .normalize_or_zero()
                    .extend(LIGHT_TYPE_DIRECTIONAL),
                spot_params: Vec4::ZERO,
            },
        }
    }
}

pub const LIGHT_TYPE_POINT: f32 = 0.0;
pub const LIGHT_TYPE_SPOT: f32 = 1.0;
pub const LIGHT_TYPE_DIRECTIONAL: f32 = 2.0;

/// GPU-friendly light data structure
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLightData {
    /// xyz = position, w = radius
    pub position: Vec4,
    /// xyz = color, w = intensity
    pub color_intensity: Vec4,
    /// xyz = direction, w = light type
    pub direction_type: Vec4,
    /// x = cos(inner_angle), y = cos(outer_angle)
    pub spot_params: Vec4,
}

/// Scene lights packed per storage buffer the lighting pass binds
#[derive(Debug, Clone, Default)]
pub struct LightBuffers {
    pub point: Vec<GpuLightData>,
    pub shadow_point: Vec<GpuLightData>,
    pub directional: Vec<GpuLightData>,
    pub shadow_directional: Vec<GpuLightData>,
    pub spot: Vec<GpuLightData>,
    pub shadow_spot: Vec<GpuLightData>,
}

impl LightBuffers {
    /// The six lists in binding order
    pub fn lists(&self) -> [(&'static str, &[GpuLightData]); 6] {
        [
            ("point lights", &self.point),
            ("shadow point lights", &self.shadow_point),
            ("directional lights", &self.directional),
            ("shadow directional lights", &self.shadow_directional),
            ("spot lights", &self.spot),
            ("shadow spot lights", &self.shadow_spot),
        ]
    }
}
