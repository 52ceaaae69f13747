/// Immediate device context - records and submits all rendering commands
///
/// There is exactly one context per device, owned by the render thread.
/// Bindings persist across draws until replaced, and across frames until
/// [`DeviceContext::set_render_targets`] clears them.

use std::sync::Arc;
use bitflags::bitflags;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, DepthStencilState, DepthStencilView, IndexType, OverlayDrawData, Pipeline,
    RasterizerState, RenderTargetView, Sampler, Texture,
};

bitflags! {
    /// Aspects cleared by [`DeviceContext::clear_depth_stencil`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const DEPTH = 0b01;
        const STENCIL = 0b10;
    }
}

/// Viewport rectangle and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with depth range [0, 1]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Immediate command context
pub trait DeviceContext: Send {
    /// Fill a color target with `color`
    fn clear_render_target(&mut self, view: &Arc<dyn RenderTargetView>, color: [f32; 4]) -> Result<()>;

    /// Clear the depth and/or stencil aspects of a depth target
    fn clear_depth_stencil(
        &mut self,
        view: &Arc<dyn DepthStencilView>,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    ) -> Result<()>;

    /// Bind output targets; `(None, None)` releases the context's references to previous targets
    fn set_render_targets(
        &mut self,
        color: Option<&Arc<dyn RenderTargetView>>,
        depth: Option<&Arc<dyn DepthStencilView>>,
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    fn set_depth_stencil_state(&mut self, state: &Arc<dyn DepthStencilState>) -> Result<()>;

    fn set_rasterizer_state(&mut self, state: &Arc<dyn RasterizerState>) -> Result<()>;

    fn set_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn set_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, index_type: IndexType) -> Result<()>;

    /// Bind a constant buffer to `slot` (0..MAX_CONSTANT_BUFFER_SLOTS)
    fn set_constant_buffer(&mut self, slot: u32, buffer: &Arc<dyn Buffer>) -> Result<()>;

    /// Bind a sampled texture to `slot` (0..MAX_TEXTURE_SLOTS)
    fn set_texture(&mut self, slot: u32, texture: &Arc<dyn Texture>) -> Result<()>;

    /// Bind a sampler to `slot` (0..MAX_SAMPLER_SLOTS)
    fn set_sampler(&mut self, slot: u32, sampler: &Arc<dyn Sampler>) -> Result<()>;

    /// Overwrite a buffer from offset 0
    fn update_buffer(&mut self, buffer: &Arc<dyn Buffer>, data: &[u8]) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) -> Result<()>;

    /// Draw overlay geometry on top of the bound color target, without depth
    ///
    /// Pipeline and state bindings made before the call are restored afterwards.
    fn draw_overlay(&mut self, data: &OverlayDrawData, font_texture: &Arc<dyn Texture>) -> Result<()>;

    /// Submit pending work and wait for the GPU to finish it
    fn flush(&mut self) -> Result<()>;

    /// Total draw calls recorded by this context
    fn draw_call_count(&self) -> u32;
}
