/// Pipeline trait, vertex layouts and pipeline descriptor
///
/// Shader resources follow one fixed binding convention shared by every
/// backend:
///
/// | binding | resource |
/// |---|---|
/// | 0..=2 | constant buffers, slot 0..=2 |
/// | 3 | sampled texture, slot 0 |
/// | 4 | sampler, slot 0 |
///
/// The samples use slot 0 for camera constants and slot 1 for per-object constants.

use std::any::Any;
use bytemuck::{Pod, Zeroable};
use crate::graphics_device::TextureFormat;

/// Number of constant buffer slots
pub const MAX_CONSTANT_BUFFER_SLOTS: u32 = 3;

/// Number of texture slots
pub const MAX_TEXTURE_SLOTS: u32 = 1;

/// Number of sampler slots
pub const MAX_SAMPLER_SLOTS: u32 = 1;

/// Constant buffer slot holding camera matrices
pub const CAMERA_CONSTANTS_SLOT: u32 = 0;

/// Constant buffer slot holding the per-object world matrix
pub const OBJECT_CONSTANTS_SLOT: u32 = 1;

/// Shader source text and its entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Shader source (WGSL)
    pub code: String,
    /// Entry point function name
    pub entry_point: String,
}

impl ShaderSource {
    pub fn new(code: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            entry_point: entry_point.into(),
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    /// Triangle list
    TriangleList,
    /// Triangle strip
    TriangleStrip,
    /// Line list
    LineList,
}

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    /// Four normalized bytes (packed RGBA color)
    Unorm8x4,
}

impl VertexFormat {
    /// Size in bytes
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Unorm8x4 => 4,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Data format
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Position (xyz) + color (rgb)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColor {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Position (xyz) + color (rgb) + texture coordinate (uv)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColorUv {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

const POSITION_COLOR_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
    VertexAttribute { location: 1, format: VertexFormat::Float32x3, offset: 12 },
];

const POSITION_COLOR_UV_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
    VertexAttribute { location: 1, format: VertexFormat::Float32x3, offset: 12 },
    VertexAttribute { location: 2, format: VertexFormat::Float32x2, offset: 24 },
];

/// Vertex layout tag chosen at pipeline creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayoutKind {
    /// [`VertexPositionColor`]
    PositionColor,
    /// [`VertexPositionColorUv`]
    PositionColorUv,
}

impl VertexLayoutKind {
    /// Distance in bytes between two vertices
    pub fn stride(&self) -> u32 {
        match self {
            VertexLayoutKind::PositionColor => std::mem::size_of::<VertexPositionColor>() as u32,
            VertexLayoutKind::PositionColorUv => std::mem::size_of::<VertexPositionColorUv>() as u32,
        }
    }

    /// Attributes in location order
    pub fn attributes(&self) -> &'static [VertexAttribute] {
        match self {
            VertexLayoutKind::PositionColor => &POSITION_COLOR_ATTRIBUTES,
            VertexLayoutKind::PositionColorUv => &POSITION_COLOR_UV_ATTRIBUTES,
        }
    }
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// Vertex shader
    pub vertex_shader: ShaderSource,
    /// Fragment (pixel) shader
    pub fragment_shader: ShaderSource,
    /// Vertex input layout
    pub vertex_layout: VertexLayoutKind,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Color attachment format
    pub color_format: TextureFormat,
    /// Depth attachment format (None = no depth attachment)
    pub depth_format: Option<TextureFormat>,
}

/// Pipeline resource trait
///
/// Rasterizer and depth-stencil state are bound separately through the
/// device context, so one pipeline serves every render-state selection.
pub trait Pipeline: Send + Sync {
    /// Vertex layout the pipeline consumes
    fn vertex_layout(&self) -> VertexLayoutKind;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
