/// Render-target and depth-stencil views
///
/// Vulkan attaches image views directly, so a view here is a typed handle
/// that keeps its texture alive. The color view of the swapchain back buffer
/// resolves to the acquired image when the context starts rendering.

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    DepthStencilView as GraphicsDepthStencilView, RenderTargetView as GraphicsRenderTargetView,
    Texture as GraphicsTexture, TextureUsage,
};
use tutorial_3d_engine::engine_error;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveKind};
use crate::vulkan_texture::{BackBuffer, Texture};

/// Color view of the swapchain back buffer
pub struct RenderTargetView {
    ctx: Arc<GpuContext>,
    texture: Arc<dyn GraphicsTexture>,
}

impl RenderTargetView {
    pub(crate) fn new(ctx: Arc<GpuContext>, texture: &Arc<dyn GraphicsTexture>) -> Result<Self> {
        if texture.as_any().downcast_ref::<BackBuffer>().is_none() {
            engine_error!(
                "tutorial3d::vulkan",
                "Render-target views can only be created from a swapchain back buffer (got {:?} texture)",
                texture.info().usage
            );
            return Err(Error::InvalidResource("render-target view needs a back buffer".to_string()));
        }

        ctx.live.acquire(LiveKind::RenderTargetView);
        Ok(Self {
            ctx,
            texture: Arc::clone(texture),
        })
    }

    /// Back buffer behind the view
    pub(crate) fn back_buffer(&self) -> Option<&BackBuffer> {
        self.texture.as_any().downcast_ref::<BackBuffer>()
    }
}

impl GraphicsRenderTargetView for RenderTargetView {
    fn texture(&self) -> &Arc<dyn GraphicsTexture> {
        &self.texture
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for RenderTargetView {
    fn drop(&mut self) {
        self.ctx.live.release(LiveKind::RenderTargetView);
    }
}

/// Depth view of a depth-stencil texture
pub struct DepthStencilView {
    ctx: Arc<GpuContext>,
    texture: Arc<dyn GraphicsTexture>,
}

impl DepthStencilView {
    pub(crate) fn new(ctx: Arc<GpuContext>, texture: &Arc<dyn GraphicsTexture>) -> Result<Self> {
        let is_depth_texture = texture
            .as_any()
            .downcast_ref::<Texture>()
            .is_some_and(|t| t.info.usage == TextureUsage::DepthStencil);
        if !is_depth_texture {
            engine_error!(
                "tutorial3d::vulkan",
                "Depth-stencil views need a DepthStencil texture (got {:?})",
                texture.info().usage
            );
            return Err(Error::InvalidResource("depth-stencil view needs a depth texture".to_string()));
        }

        ctx.live.acquire(LiveKind::DepthStencilView);
        Ok(Self {
            ctx,
            texture: Arc::clone(texture),
        })
    }

    /// Depth image behind the view
    pub(crate) fn depth_texture(&self) -> Option<&Texture> {
        self.texture.as_any().downcast_ref::<Texture>()
    }
}

impl GraphicsDepthStencilView for DepthStencilView {
    fn texture(&self) -> &Arc<dyn GraphicsTexture> {
        &self.texture
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DepthStencilView {
    fn drop(&mut self) {
        self.ctx.live.release(LiveKind::DepthStencilView);
    }
}
