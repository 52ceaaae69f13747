/// Frame renderer - enforces the per-frame command order
///
/// ```text
/// begin_frame -> Idle -> clear -> Cleared -> bind -> Bound -> draw -> Drawn
///     (draw again | draw_overlay once) -> present -> Presented
/// ```
///
/// An out-of-order call or a backend failure abandons the frame; the next
/// `begin_frame` starts over from `Idle`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, ClearFlags, DeviceContext, IndexType, OverlayDrawData, Pipeline, Sampler, Texture,
    Viewport,
};
use crate::render_state::{RenderStateCatalog, RenderStateSelection};
use crate::swapchain_manager::SwapchainManager;
use crate::{engine_error, engine_trace, engine_warn};

/// Position in the frame sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Cleared,
    Bound,
    Drawn,
    Presented,
}

/// Everything bound before drawing
pub struct FrameBindings<'a> {
    pub pipeline: &'a Arc<dyn Pipeline>,
    /// Catalog and current selection; `None` keeps the backend defaults
    pub render_states: Option<(&'a RenderStateCatalog, &'a RenderStateSelection)>,
    pub vertex_buffer: Option<&'a Arc<dyn Buffer>>,
    pub index_buffer: Option<(&'a Arc<dyn Buffer>, IndexType)>,
    /// `(slot, buffer)` pairs
    pub constant_buffers: &'a [(u32, &'a Arc<dyn Buffer>)],
    pub texture: Option<&'a Arc<dyn Texture>>,
    pub sampler: Option<&'a Arc<dyn Sampler>>,
}

impl<'a> FrameBindings<'a> {
    /// Pipeline only, everything else unbound
    pub fn new(pipeline: &'a Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            render_states: None,
            vertex_buffer: None,
            index_buffer: None,
            constant_buffers: &[],
            texture: None,
            sampler: None,
        }
    }
}

/// One draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    NonIndexed { vertex_count: u32, first_vertex: u32 },
    Indexed { index_count: u32, first_index: u32, base_vertex: i32 },
}

pub struct FrameRenderer {
    phase: FramePhase,
    clear_color: [f32; 4],
    clear_depth: f32,
    sync_interval: u32,
    overlay_drawn: bool,
    frames_presented: u64,
    frames_abandoned: u64,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer {
    /// Dark grey clear color, depth cleared to 1.0, vsync present
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            clear_depth: 1.0,
            sync_interval: 1,
            overlay_drawn: false,
            frames_presented: 0,
            frames_abandoned: 0,
        }
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_sync_interval(mut self, sync_interval: u32) -> Self {
        self.sync_interval = sync_interval;
        self
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn frames_abandoned(&self) -> u64 {
        self.frames_abandoned
    }

    /// Start a new frame; an unfinished previous frame counts as abandoned
    pub fn begin_frame(&mut self) {
        if matches!(self.phase, FramePhase::Cleared | FramePhase::Bound | FramePhase::Drawn) {
            engine_warn!("tutorial3d::FrameRenderer", "Frame abandoned in phase {:?}", self.phase);
            self.frames_abandoned += 1;
        }
        self.phase = FramePhase::Idle;
        self.overlay_drawn = false;
    }

    /// Bind the swapchain targets, set the viewport and clear color and depth
    pub fn clear(&mut self, context: &mut dyn DeviceContext, swapchain: &SwapchainManager) -> Result<()> {
        self.expect("clear", &[FramePhase::Idle])?;

        let result = (|| -> Result<()> {
            let color = swapchain.render_target_view().ok_or_else(|| {
                Error::InvalidResource("swapchain has no render target view".to_string())
            })?;
            let depth = swapchain.depth_stencil_view();

            context.set_render_targets(Some(color), depth)?;
            context.set_viewport(Viewport::from_size(swapchain.width(), swapchain.height()));
            context.clear_render_target(color, self.clear_color)?;
            if let Some(depth) = depth {
                context.clear_depth_stencil(depth, ClearFlags::DEPTH | ClearFlags::STENCIL, self.clear_depth, 0)?;
            }
            Ok(())
        })();

        self.advance(result, FramePhase::Cleared)
    }

    /// Bind pipeline, render states, buffers, texture and sampler
    pub fn bind(&mut self, context: &mut dyn DeviceContext, bindings: &FrameBindings<'_>) -> Result<()> {
        self.expect("bind", &[FramePhase::Cleared])?;

        let result = (|| -> Result<()> {
            context.set_pipeline(bindings.pipeline)?;
            if let Some((catalog, selection)) = bindings.render_states {
                catalog.apply(context, selection)?;
            }
            if let Some(buffer) = bindings.vertex_buffer {
                context.set_vertex_buffer(buffer, 0)?;
            }
            if let Some((buffer, index_type)) = bindings.index_buffer {
                context.set_index_buffer(buffer, index_type)?;
            }
            for (slot, buffer) in bindings.constant_buffers {
                context.set_constant_buffer(*slot, buffer)?;
            }
            if let Some(texture) = bindings.texture {
                context.set_texture(0, texture)?;
            }
            if let Some(sampler) = bindings.sampler {
                context.set_sampler(0, sampler)?;
            }
            Ok(())
        })();

        self.advance(result, FramePhase::Bound)
    }

    /// Issue a draw; may repeat once drawn, but not after the overlay
    pub fn draw(&mut self, context: &mut dyn DeviceContext, call: DrawCall) -> Result<()> {
        self.expect("draw", &[FramePhase::Bound, FramePhase::Drawn])?;
        if self.overlay_drawn {
            engine_error!("tutorial3d::FrameRenderer", "draw called after the overlay");
            return self.abandon(Error::InvalidFrameState("draw after overlay".to_string()));
        }

        let result = match call {
            DrawCall::NonIndexed { vertex_count, first_vertex } => context.draw(vertex_count, first_vertex),
            DrawCall::Indexed { index_count, first_index, base_vertex } => {
                context.draw_indexed(index_count, first_index, base_vertex)
            }
        };

        self.advance(result, FramePhase::Drawn)
    }

    /// Draw the debug overlay on top of the scene (once per frame, after a draw)
    pub fn draw_overlay(
        &mut self,
        context: &mut dyn DeviceContext,
        data: &OverlayDrawData,
        font_texture: &Arc<dyn Texture>,
    ) -> Result<()> {
        self.expect("draw_overlay", &[FramePhase::Drawn])?;
        if self.overlay_drawn {
            return self.abandon(Error::InvalidFrameState("overlay already drawn this frame".to_string()));
        }

        let result = context.draw_overlay(data, font_texture);
        self.overlay_drawn = result.is_ok();
        self.advance(result, FramePhase::Drawn)
    }

    /// Present with the configured sync interval
    pub fn present(&mut self, swapchain: &mut SwapchainManager) -> Result<()> {
        self.expect("present", &[FramePhase::Drawn])?;

        let result = swapchain.present(self.sync_interval);
        self.advance(result, FramePhase::Presented)?;
        self.frames_presented += 1;
        engine_trace!("tutorial3d::FrameRenderer", "Frame {} presented", self.frames_presented);
        Ok(())
    }

    // ===== INTERNAL =====

    fn expect(&mut self, operation: &str, allowed: &[FramePhase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            return Ok(());
        }
        let message = format!("{} called in phase {:?}", operation, self.phase);
        engine_error!("tutorial3d::FrameRenderer", "{}", message);
        self.abandon(Error::InvalidFrameState(message))
    }

    fn advance(&mut self, result: Result<()>, next: FramePhase) -> Result<()> {
        match result {
            Ok(()) => {
                self.phase = next;
                Ok(())
            }
            Err(e) => {
                engine_error!("tutorial3d::FrameRenderer", "Frame failed in phase {:?}: {}", self.phase, e);
                self.abandon(e)
            }
        }
    }

    fn abandon(&mut self, error: Error) -> Result<()> {
        self.phase = FramePhase::Idle;
        self.overlay_drawn = false;
        self.frames_abandoned += 1;
        Err(error)
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
