/*!
# Tutorial 3D Engine - Vulkan Backend

Vulkan implementation of the Tutorial3D graphics device.

This crate implements the `tutorial_3d_engine` device traits with the Ash
bindings, gpu-allocator for memory and naga to turn WGSL into SPIR-V.
Rendering uses Vulkan 1.3 dynamic rendering with one frame in flight, which
keeps the immediate-context model of the engine simple to express.

The backend is registered as a plugin and selected at runtime by name.
*/

// Device and shared context
mod vulkan;
mod vulkan_context;
mod debug;

// Resources
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_render_state;
mod vulkan_render_target;

// Presentation and command recording
mod vulkan_frame;
mod vulkan_swapchain;
mod vulkan_device_context;
mod vulkan_overlay;

use tutorial_3d_engine::tutorial3d::{GraphicsDevice, Result};
use tutorial_3d_engine::tutorial3d::render::register_graphics_device_plugin;

pub use vulkan::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};

/// Name under which [`register`] publishes the backend
pub const PLUGIN_NAME: &str = "vulkan";

/// Register the Vulkan backend with the plugin system
///
/// # Example
///
/// ```no_run
/// use tutorial_3d_engine::tutorial3d::render::{with_plugin_registry, Config};
/// # fn run(window: &winit::window::Window) -> tutorial_3d_engine::tutorial3d::Result<()> {
/// tutorial_3d_engine_renderer_vulkan::register()?;
/// let _device = with_plugin_registry(|registry| {
///     registry.create_graphics_device("vulkan", window, Config::default())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn register() -> Result<()> {
    register_graphics_device_plugin(PLUGIN_NAME, |window: &winit::window::Window, config| {
        let device: Box<dyn GraphicsDevice> = Box::new(VulkanGraphicsDevice::new(window, config)?);
        Ok(device)
    })
}
