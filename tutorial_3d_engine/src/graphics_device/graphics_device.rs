/// GraphicsDevice trait - main resource factory interface

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use winit::window::Window;

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, DepthStencilDesc, DepthStencilState, DepthStencilView, DeviceContext,
    Pipeline, PipelineDesc, RasterizerDesc, RasterizerState, RenderTargetView, Sampler,
    SamplerDesc, Swapchain, SwapchainDesc, Texture, TextureDesc,
};

// ============================================================================
// Configuration and statistics
// ============================================================================

/// Graphics device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Present with vertical sync (FIFO)
    pub vsync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Tutorial3D Application".to_string(),
            app_version: (1, 0, 0),
            vsync: true,
        }
    }
}

/// Cumulative creation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsDeviceStats {
    pub buffers_created: u32,
    pub textures_created: u32,
    pub pipelines_created: u32,
    pub states_created: u32,
    pub views_created: u32,
    /// GPU memory currently allocated (bytes)
    pub gpu_memory_used: u64,
}

/// Device objects still alive, reported before the device is destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjectReport {
    pub buffers: u32,
    pub textures: u32,
    pub samplers: u32,
    pub pipelines: u32,
    pub depth_stencil_states: u32,
    pub rasterizer_states: u32,
    pub render_target_views: u32,
    pub depth_stencil_views: u32,
}

impl LiveObjectReport {
    /// Sum of every category
    pub fn total(&self) -> u32 {
        self.buffers
            + self.textures
            + self.samplers
            + self.pipelines
            + self.depth_stencil_states
            + self.rasterizer_states
            + self.render_target_views
            + self.depth_stencil_views
    }

    /// True when nothing leaked
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for LiveObjectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} live objects (buffers: {}, textures: {}, samplers: {}, pipelines: {}, \
             depth-stencil states: {}, rasterizer states: {}, render-target views: {}, \
             depth-stencil views: {})",
            self.total(),
            self.buffers,
            self.textures,
            self.samplers,
            self.pipelines,
            self.depth_stencil_states,
            self.rasterizer_states,
            self.render_target_views,
            self.depth_stencil_views,
        )
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main graphics device trait
///
/// Factory for every GPU object. Rendering commands go through the
/// immediate [`DeviceContext`], which can be taken only once.
pub trait GraphicsDevice: Send {
    /// Create a vertex, index or constant buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a sampled texture (with initial data) or a depth-stencil texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_sampler(&mut self, desc: SamplerDesc) -> Result<Arc<dyn Sampler>>;

    /// Compile both shader stages and create a graphics pipeline
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_depth_stencil_state(&mut self, desc: &DepthStencilDesc) -> Result<Arc<dyn DepthStencilState>>;

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<Arc<dyn RasterizerState>>;

    /// Create the swapchain for the window the device was created with
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    /// Color view of a render-target texture (typically a swapchain back buffer)
    fn create_render_target_view(&mut self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTargetView>>;

    /// Depth view of a depth-stencil texture
    fn create_depth_stencil_view(&mut self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn DepthStencilView>>;

    /// Take the immediate context; fails with `InitializationFailed` on the second call
    fn create_immediate_context(&mut self) -> Result<Box<dyn DeviceContext>>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    fn stats(&self) -> GraphicsDeviceStats;

    /// Objects created by this device that are still alive
    fn report_live_objects(&self) -> LiveObjectReport;
}

// ============================================================================
// Plugin system for registering graphics device backends
// ============================================================================

/// Backend factory function type
type GraphicsDevicePluginFactory =
    Box<dyn Fn(&Window, Config) -> Result<Box<dyn GraphicsDevice>> + Send + Sync>;

/// Plugin registry for graphics device backends
pub struct GraphicsDevicePluginRegistry {
    plugins: HashMap<&'static str, GraphicsDevicePluginFactory>,
}

impl GraphicsDevicePluginRegistry {
    fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register (or replace) a plugin
    pub fn register_plugin<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&Window, Config) -> Result<Box<dyn GraphicsDevice>> + Send + Sync + 'static,
    {
        self.plugins.insert(name, Box::new(factory));
    }

    /// True when `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered plugin names, sorted
    pub fn plugin_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.plugins.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Create a graphics device using a registered plugin
    pub fn create_graphics_device(
        &self,
        plugin_name: &str,
        window: &Window,
        config: Config,
    ) -> Result<Box<dyn GraphicsDevice>> {
        let factory = self.plugins.get(plugin_name).ok_or_else(|| {
            Error::InitializationFailed(format!("Plugin '{}' not found", plugin_name))
        })?;
        factory(window, config)
    }
}

static GRAPHICS_DEVICE_REGISTRY: Mutex<Option<GraphicsDevicePluginRegistry>> = Mutex::new(None);

/// Run `f` against the global registry, creating it on first access
pub fn with_plugin_registry<R>(f: impl FnOnce(&mut GraphicsDevicePluginRegistry) -> R) -> Result<R> {
    let mut guard = GRAPHICS_DEVICE_REGISTRY
        .lock()
        .map_err(|_| Error::BackendError("Graphics device plugin registry lock poisoned".to_string()))?;
    let registry = guard.get_or_insert_with(GraphicsDevicePluginRegistry::new);
    Ok(f(registry))
}

/// Register a graphics device plugin in the global registry
pub fn register_graphics_device_plugin<F>(name: &'static str, factory: F) -> Result<()>
where
    F: Fn(&Window, Config) -> Result<Box<dyn GraphicsDevice>> + Send + Sync + 'static,
{
    with_plugin_registry(|registry| registry.register_plugin(name, factory))?;
    crate::engine_debug!("tutorial3d::GraphicsDevice", "Registered graphics device plugin '{}'", name);
    Ok(())
}

#[cfg(test)]
#[path = "graphics_device_tests.rs"]
mod tests;
