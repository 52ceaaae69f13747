/// Depth-stencil and rasterizer state objects
///
/// Vulkan 1.3 makes cull mode, front face and the depth test dynamic, so a
/// state object is its descriptor plus the converted values the context
/// writes at draw time. Fill mode picks between a pipeline's fill and
/// wireframe variants.

use tutorial_3d_engine::tutorial3d::render::{
    CompareOp, CullMode, DepthStencilDesc, DepthStencilState as GraphicsDepthStencilState, FillMode,
    RasterizerDesc, RasterizerState as GraphicsRasterizerState,
};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveKind};

/// Vulkan depth-stencil state
pub struct DepthStencilState {
    ctx: Arc<GpuContext>,
    desc: DepthStencilDesc,
    pub(crate) compare_op: vk::CompareOp,
}

impl DepthStencilState {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &DepthStencilDesc) -> Self {
        ctx.live.acquire(LiveKind::DepthStencilState);
        Self {
            ctx,
            desc: *desc,
            compare_op: compare_op_to_vk(desc.depth_func),
        }
    }

    /// Test enabled flag as written to the command buffer
    pub(crate) fn test_enable(&self) -> bool {
        self.desc.depth_enable
    }

    /// Writes only happen when the test is enabled
    pub(crate) fn write_enable(&self) -> bool {
        self.desc.depth_enable && self.desc.depth_write_enable
    }
}

impl GraphicsDepthStencilState for DepthStencilState {
    fn desc(&self) -> &DepthStencilDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DepthStencilState {
    fn drop(&mut self) {
        self.ctx.live.release(LiveKind::DepthStencilState);
    }
}

/// Vulkan rasterizer state
pub struct RasterizerState {
    ctx: Arc<GpuContext>,
    desc: RasterizerDesc,
    pub(crate) cull_mode: vk::CullModeFlags,
    pub(crate) front_face: vk::FrontFace,
}

impl RasterizerState {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RasterizerDesc) -> Self {
        ctx.live.acquire(LiveKind::RasterizerState);
        Self {
            ctx,
            desc: *desc,
            cull_mode: cull_mode_to_vk(desc.cull_mode),
            front_face: front_face_to_vk(desc.front_counter_clockwise),
        }
    }

    pub(crate) fn wireframe(&self) -> bool {
        self.desc.fill_mode == FillMode::Wireframe
    }
}

impl GraphicsRasterizerState for RasterizerState {
    fn desc(&self) -> &RasterizerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for RasterizerState {
    fn drop(&mut self) {
        self.ctx.live.release(LiveKind::RasterizerState);
    }
}

/// Dynamic rasterizer values used while no rasterizer state is bound:
/// solid fill, back-face culling, clockwise front faces
pub(crate) const DEFAULT_CULL_MODE: vk::CullModeFlags = vk::CullModeFlags::BACK;
pub(crate) const DEFAULT_FRONT_FACE: vk::FrontFace = vk::FrontFace::CLOCKWISE;

/// Convert CompareOp to Vulkan compare op
pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

/// Convert CullMode to Vulkan cull flags
pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

/// Winding of front faces as seen on screen
pub(crate) fn front_face_to_vk(front_counter_clockwise: bool) -> vk::FrontFace {
    if front_counter_clockwise {
        vk::FrontFace::COUNTER_CLOCKWISE
    } else {
        vk::FrontFace::CLOCKWISE
    }
}

/// Convert FillMode to Vulkan polygon mode
pub(crate) fn polygon_mode_to_vk(mode: FillMode) -> vk::PolygonMode {
    match mode {
        FillMode::Solid => vk::PolygonMode::FILL,
        FillMode::Wireframe => vk::PolygonMode::LINE,
    }
}
