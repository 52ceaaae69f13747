/// Depth-stencil and rasterizer state objects
///
/// Both are immutable once created and bound as a whole through the device context.

use std::any::Any;

/// Comparison operator for the depth test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Never pass
    Never,
    /// Pass if incoming < stored
    Less,
    /// Pass if incoming == stored
    Equal,
    /// Pass if incoming <= stored
    LessOrEqual,
    /// Pass if incoming > stored
    Greater,
    /// Pass if incoming != stored
    NotEqual,
    /// Pass if incoming >= stored
    GreaterOrEqual,
    /// Always pass
    Always,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Filled triangles
    Solid,
    /// Edges only
    Wireframe,
}

/// Descriptor for a depth-stencil state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    /// Enable the depth test
    pub depth_enable: bool,
    /// Write passing fragments to the depth buffer
    pub depth_write_enable: bool,
    /// Depth comparison (ignored when the test is disabled)
    pub depth_func: CompareOp,
}

impl DepthStencilDesc {
    /// Depth test and depth writes off
    pub fn disabled() -> Self {
        Self {
            depth_enable: false,
            depth_write_enable: false,
            depth_func: CompareOp::Less,
        }
    }

    /// Depth test on with `func`, writes on
    pub fn enabled(func: CompareOp) -> Self {
        Self {
            depth_enable: true,
            depth_write_enable: true,
            depth_func: func,
        }
    }
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self::enabled(CompareOp::Less)
    }
}

/// Descriptor for a rasterizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    /// Counter-clockwise triangles are front-facing
    pub front_counter_clockwise: bool,
    /// Clip against the near and far planes
    pub depth_clip_enable: bool,
}

impl RasterizerDesc {
    pub fn new(fill_mode: FillMode, cull_mode: CullMode) -> Self {
        Self {
            fill_mode,
            cull_mode,
            front_counter_clockwise: true,
            depth_clip_enable: true,
        }
    }
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self::new(FillMode::Solid, CullMode::Back)
    }
}

/// Immutable depth-stencil state object
pub trait DepthStencilState: Send + Sync {
    fn desc(&self) -> &DepthStencilDesc;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Immutable rasterizer state object
pub trait RasterizerState: Send + Sync {
    fn desc(&self) -> &RasterizerDesc;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
