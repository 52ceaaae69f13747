/// Device resources - graphics device, immediate context and swapchain
///
/// Fields drop in declaration order, so on shutdown the swapchain views go
/// first, then the swapchain, the context and finally the device.

use winit::window::Window;

use crate::error::Result;
use crate::graphics_device::{
    with_plugin_registry, Config, DeviceContext, GraphicsDevice, SwapchainDesc, TextureFormat,
};
use crate::swapchain_manager::{ResizeListener, ResizeOutcome, SwapchainManager};
use crate::{engine_debug, engine_info, engine_warn};

pub struct DeviceResources {
    swapchain: SwapchainManager,
    context: Box<dyn DeviceContext>,
    device: Box<dyn GraphicsDevice>,
}

impl DeviceResources {
    /// Create everything through a registered graphics device plugin
    pub fn create(
        window: &Window,
        plugin_name: &str,
        config: Config,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self> {
        let size = window.inner_size();
        let mut desc = SwapchainDesc::new(size.width.max(1), size.height.max(1));
        desc.vsync = config.vsync;

        let device = with_plugin_registry(|registry| {
            registry.create_graphics_device(plugin_name, window, config)
        })??;
        engine_info!("tutorial3d::DeviceResources", "Graphics device '{}' created", plugin_name);

        Self::from_device(device, &desc, depth_format)
    }

    /// Create the context and swapchain on an existing device
    pub fn from_device(
        mut device: Box<dyn GraphicsDevice>,
        desc: &SwapchainDesc,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self> {
        let context = device.create_immediate_context()?;
        let swapchain = SwapchainManager::new(device.as_mut(), desc, depth_format)?;
        engine_debug!(
            "tutorial3d::DeviceResources",
            "Swapchain {}x{} ({} buffers, {:?})",
            swapchain.width(),
            swapchain.height(),
            swapchain.buffer_count(),
            swapchain.format()
        );

        Ok(Self { swapchain, context, device })
    }

    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn context(&mut self) -> &mut dyn DeviceContext {
        self.context.as_mut()
    }

    pub fn swapchain(&self) -> &SwapchainManager {
        &self.swapchain
    }

    /// Borrow device, context and swapchain at the same time
    pub fn parts(&mut self) -> (&mut dyn GraphicsDevice, &mut dyn DeviceContext, &mut SwapchainManager) {
        (self.device.as_mut(), self.context.as_mut(), &mut self.swapchain)
    }

    /// Resize the swapchain buffers and rebuild their views
    pub fn resize(&mut self, width: u32, height: u32, listeners: &mut [&mut dyn ResizeListener]) -> Result<ResizeOutcome> {
        self.swapchain
            .resize(self.device.as_mut(), self.context.as_mut(), width, height, listeners)
    }
}

impl Drop for DeviceResources {
    fn drop(&mut self) {
        if let Err(e) = self.context.flush() {
            engine_warn!("tutorial3d::DeviceResources", "Flush on shutdown failed: {}", e);
        }
        if let Err(e) = self.context.set_render_targets(None, None) {
            engine_warn!("tutorial3d::DeviceResources", "Unbinding render targets failed: {}", e);
        }
        self.swapchain.destroy_swapchain_resources();
        if let Err(e) = self.device.wait_idle() {
            engine_warn!("tutorial3d::DeviceResources", "wait_idle on shutdown failed: {}", e);
        }
        engine_debug!("tutorial3d::DeviceResources", "Device resources released");
    }
}

#[cfg(test)]
#[path = "device_resources_tests.rs"]
mod tests;
