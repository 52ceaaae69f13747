/// Swapchain manager - owns the swapchain and the views derived from it
///
/// The render-target view (and the optional depth texture + depth-stencil
/// view) are rebuilt from scratch whenever the swapchain buffers change.
/// `views_created` and `views_destroyed` make the create/destroy balance
/// observable: they are equal whenever `resize_buffers` runs.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    DepthStencilView, DeviceContext, GraphicsDevice, RenderTargetView, Swapchain, SwapchainDesc,
    Texture, TextureDesc, TextureFormat, TextureUsage,
};
use crate::{engine_debug, engine_error, engine_info};

/// Notified after the swapchain buffers and views were successfully rebuilt
pub trait ResizeListener {
    fn on_swapchain_resized(&mut self, width: u32, height: u32);
}

/// Result of [`SwapchainManager::resize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Buffers and views now have the requested size, listeners were notified
    Resized { width: u32, height: u32 },
    /// Zero-sized request (minimized window), nothing changed
    Skipped,
    /// The buffers kept their old size, views were recreated at that size
    Failed,
}

pub struct SwapchainManager {
    swapchain: Box<dyn Swapchain>,
    depth_format: Option<TextureFormat>,
    render_target_view: Option<Arc<dyn RenderTargetView>>,
    depth_texture: Option<Arc<dyn Texture>>,
    depth_stencil_view: Option<Arc<dyn DepthStencilView>>,
    views_created: u64,
    views_destroyed: u64,
}

impl SwapchainManager {
    /// Create the swapchain and its views
    ///
    /// `depth_format` = `None` renders without a depth buffer.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        desc: &SwapchainDesc,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self> {
        let swapchain = device.create_swapchain(desc).map_err(|e| {
            engine_error!("tutorial3d::SwapchainManager", "Failed to create swapchain: {}", e);
            e
        })?;
        let mut manager = Self::from_swapchain(swapchain, depth_format);
        manager.create_swapchain_resources(device)?;
        Ok(manager)
    }

    /// Wrap an existing swapchain; views are created by [`Self::create_swapchain_resources`]
    pub fn from_swapchain(swapchain: Box<dyn Swapchain>, depth_format: Option<TextureFormat>) -> Self {
        Self {
            swapchain,
            depth_format,
            render_target_view: None,
            depth_texture: None,
            depth_stencil_view: None,
            views_created: 0,
            views_destroyed: 0,
        }
    }

    /// Derive the render-target view (and depth resources) from the current back buffer
    ///
    /// Existing views are released first. Nothing is stored unless every view succeeds.
    pub fn create_swapchain_resources(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.destroy_swapchain_resources();

        let back_buffer = self.swapchain.back_buffer().map_err(|e| {
            engine_error!("tutorial3d::SwapchainManager", "Failed to get back buffer from swapchain: {}", e);
            Error::BackBufferUnavailable(e.to_string())
        })?;

        let render_target_view = device.create_render_target_view(&back_buffer).map_err(|e| {
            engine_error!("tutorial3d::SwapchainManager", "Failed to create rendertarget view from back buffer: {}", e);
            Error::ViewCreationFailed(format!("render target view: {}", e))
        })?;
        drop(back_buffer);

        let depth = match self.depth_format {
            Some(format) => Some(self.create_depth_resources(device, format)?),
            None => None,
        };

        self.render_target_view = Some(render_target_view);
        self.views_created += 1;
        if let Some((texture, view)) = depth {
            self.depth_texture = Some(texture);
            self.depth_stencil_view = Some(view);
            self.views_created += 1;
        }

        engine_debug!(
            "tutorial3d::SwapchainManager",
            "Swapchain resources created ({}x{}, depth: {})",
            self.width(),
            self.height(),
            self.depth_format.is_some()
        );
        Ok(())
    }

    fn create_depth_resources(
        &self,
        device: &mut dyn GraphicsDevice,
        format: TextureFormat,
    ) -> Result<(Arc<dyn Texture>, Arc<dyn DepthStencilView>)> {
        let texture = device
            .create_texture(TextureDesc {
                width: self.swapchain.width(),
                height: self.swapchain.height(),
                format,
                usage: TextureUsage::DepthStencil,
                data: None,
            })
            .map_err(|e| {
                engine_error!("tutorial3d::SwapchainManager", "Failed to create depth texture: {}", e);
                Error::ViewCreationFailed(format!("depth texture: {}", e))
            })?;

        let view = device.create_depth_stencil_view(&texture).map_err(|e| {
            engine_error!("tutorial3d::SwapchainManager", "Failed to create depth stencil view: {}", e);
            Error::ViewCreationFailed(format!("depth stencil view: {}", e))
        })?;

        Ok((texture, view))
    }

    /// Release every view derived from the swapchain (safe to call repeatedly)
    pub fn destroy_swapchain_resources(&mut self) {
        if self.render_target_view.take().is_some() {
            self.views_destroyed += 1;
        }
        if self.depth_stencil_view.take().is_some() {
            self.views_destroyed += 1;
        }
        self.depth_texture = None;
    }

    /// Resize the swapchain buffers and rebuild the views
    ///
    /// Order: flush, unbind and destroy views, resize buffers, recreate
    /// views, notify listeners. A failed buffer resize is logged, the views
    /// are recreated at the old size and listeners are not notified.
    pub fn resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        context: &mut dyn DeviceContext,
        width: u32,
        height: u32,
        listeners: &mut [&mut dyn ResizeListener],
    ) -> Result<ResizeOutcome> {
        if width == 0 || height == 0 {
            engine_debug!("tutorial3d::SwapchainManager", "Skipping resize to {}x{}", width, height);
            return Ok(ResizeOutcome::Skipped);
        }

        context.flush()?;
        context.set_render_targets(None, None)?;
        self.destroy_swapchain_resources();
        debug_assert_eq!(self.views_created, self.views_destroyed);

        if let Err(e) = self.swapchain.resize_buffers(width, height) {
            engine_error!("tutorial3d::SwapchainManager", "Failed to recreate swapchain buffers: {}", e);
            self.create_swapchain_resources(device)?;
            return Ok(ResizeOutcome::Failed);
        }

        self.create_swapchain_resources(device)?;

        for listener in listeners.iter_mut() {
            listener.on_swapchain_resized(width, height);
        }

        engine_info!("tutorial3d::SwapchainManager", "Swapchain resized to {}x{}", width, height);
        Ok(ResizeOutcome::Resized { width, height })
    }

    /// Present the current back buffer
    pub fn present(&mut self, sync_interval: u32) -> Result<()> {
        self.swapchain.present(sync_interval)
    }

    // ===== ACCESSORS =====

    pub fn render_target_view(&self) -> Option<&Arc<dyn RenderTargetView>> {
        self.render_target_view.as_ref()
    }

    pub fn depth_stencil_view(&self) -> Option<&Arc<dyn DepthStencilView>> {
        self.depth_stencil_view.as_ref()
    }

    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }

    pub fn width(&self) -> u32 {
        self.swapchain.width()
    }

    pub fn height(&self) -> u32 {
        self.swapchain.height()
    }

    pub fn format(&self) -> TextureFormat {
        self.swapchain.format()
    }

    pub fn buffer_count(&self) -> u32 {
        self.swapchain.buffer_count()
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    /// Views created since construction
    pub fn views_created(&self) -> u64 {
        self.views_created
    }

    /// Views destroyed since construction
    pub fn views_destroyed(&self) -> u64 {
        self.views_destroyed
    }
}

#[cfg(test)]
#[path = "swapchain_manager_tests.rs"]
mod tests;
