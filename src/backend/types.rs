//! Descriptor types shared between the frame graph and backends
//!
//! Descriptors are pure values. Structural equality of two descriptors is what
//! the frame graph uses to decide whether a physical object can be reused.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// Two dimensional size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale both dimensions, never going below one pixel
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            width: ((self.width as f32) * scale).max(1.0) as u32,
            height: ((self.height as f32) * scale).max(1.0) as u32,
        }
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    R32Float,
    Rg32Float,
    Rgba16Float,
    Rgba32Float,
    Rgba32Sint,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUsage(u32);

impl TextureUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    pub const STORAGE_BINDING: Self = Self(1 << 3);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const INDEX: Self = Self(1 << 2);
    pub const VERTEX: Self = Self(1 << 3);
    pub const UNIFORM: Self = Self(1 << 4);
    pub const STORAGE: Self = Self(1 << 5);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    #[default]
    Texture2D,
    Texture2DMultisample,
    CubeMap,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

impl IndexFormat {
    pub fn size(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Vertex buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

impl VertexBufferDesc {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
        }
    }
}

/// Index buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexBufferDesc {
    pub size: u64,
    pub format: IndexFormat,
    pub usage: BufferUsage,
}

impl IndexBufferDesc {
    pub fn new(count: u64, format: IndexFormat) -> Self {
        Self {
            size: count * format.size(),
            format,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
        }
    }
}

/// Uniform buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

impl UniformBufferDesc {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }
    }
}

/// Shader storage buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStorageBufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

impl ShaderStorageBufferDesc {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureBufferDesc {
    pub size: Extent2d,
    pub format: TextureFormat,
    pub texture_type: TextureType,
    pub mip_levels: u32,
    pub samples: u32,
    pub usage: TextureUsage,
}

impl TextureBufferDesc {
    /// Render-attachable, sampled 2D texture
    pub fn attachment(size: Extent2d, format: TextureFormat) -> Self {
        Self {
            size,
            format,
            texture_type: TextureType::Texture2D,
            mip_levels: 1,
            samples: 1,
            usage: TextureUsage::RENDER_ATTACHMENT
                | TextureUsage::TEXTURE_BINDING
                | TextureUsage::COPY_SRC
                | TextureUsage::COPY_DST,
        }
    }
}

impl Default for TextureBufferDesc {
    fn default() -> Self {
        Self {
            size: Extent2d::new(1, 1),
            format: TextureFormat::Rgba8Unorm,
            texture_type: TextureType::Texture2D,
            mip_levels: 1,
            samples: 1,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

/// Texture array descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureArrayBufferDesc {
    pub size: Extent2d,
    pub layers: u32,
    pub format: TextureFormat,
    pub texture_type: TextureType,
    pub usage: TextureUsage,
}

impl Default for TextureArrayBufferDesc {
    fn default() -> Self {
        Self {
            size: Extent2d::new(1, 1),
            layers: 1,
            format: TextureFormat::Rgba8Unorm,
            texture_type: TextureType::Texture2D,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

/// Render target descriptor
///
/// A render target is the framebuffer object that textures are attached to
/// while a render pass is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetDesc {
    pub size: Extent2d,
    pub samples: u32,
    pub color_attachments: u32,
    pub has_depth_stencil: bool,
}

impl RenderTargetDesc {
    pub fn new(size: Extent2d, color_attachments: u32, has_depth_stencil: bool) -> Self {
        Self {
            size,
            samples: 1,
            color_attachments,
            has_depth_stencil,
        }
    }
}

/// Render pass descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub color_attachments: u32,
    pub has_depth_stencil: bool,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Compare function for depth/stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Depth test configuration of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthTest {
    pub compare: CompareFunction,
    pub write: bool,
}

impl Default for DepthTest {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Less,
            write: true,
        }
    }
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    Min,
    Max,
}

/// Blend component state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

/// Blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub fn alpha_blending() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
        }
    }
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// A shader program referenced by name.
///
/// Compilation and source lookup belong to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub name: String,
    pub entry_point: String,
}

impl ShaderSource {
    pub fn vertex(name: &str) -> Self {
        Self {
            stage: ShaderStage::Vertex,
            name: name.to_string(),
            entry_point: "vs_main".to_string(),
        }
    }

    pub fn fragment(name: &str) -> Self {
        Self {
            stage: ShaderStage::Fragment,
            name: name.to_string(),
            entry_point: "fs_main".to_string(),
        }
    }
}

/// Resource binding slot type of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    ShaderStorageBuffer,
    TextureBuffer,
    TextureArrayBuffer,
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Vertex buffer layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// Render pipeline descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPipelineDesc {
    pub shaders: Vec<ShaderSource>,
    pub bindings: Vec<BindingType>,
    pub primitive: PrimitiveTopology,
    pub vertex_layout: Option<VertexBufferLayout>,
    pub cull_mode: CullMode,
    pub depth_test: Option<DepthTest>,
    pub blend: Option<BlendState>,
    pub color_targets: u32,
}

impl Default for RenderPipelineDesc {
    fn default() -> Self {
        Self {
            shaders: Vec::new(),
            bindings: Vec::new(),
            primitive: PrimitiveTopology::TriangleList,
            vertex_layout: None,
            cull_mode: CullMode::None,
            depth_test: None,
            blend: None,
            color_targets: 1,
        }
    }
}

/// Standard vertex with position, normal, UV, and tangent
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec4,
}

impl Vertex {
    pub fn new(position: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal: Vec3::Z,
            uv,
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
        }
    }

    pub fn layout() -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x3,
                    offset: 12,
                },
                VertexAttribute {
                    location: 2,
                    format: VertexFormat::Float32x2,
                    offset: 24,
                },
                VertexAttribute {
                    location: 3,
                    format: VertexFormat::Float32x4,
                    offset: 32,
                },
            ],
        }
    }
}

/// Two triangles covering the whole viewport in normalized device coordinates
pub fn fullscreen_quad() -> [Vertex; 6] {
    [
        Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::new(0.0, 0.0)),
        Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::new(0.0, 0.0)),
        Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(-1.0, 1.0, 0.0), Vec2::new(0.0, 1.0)),
    ]
}
