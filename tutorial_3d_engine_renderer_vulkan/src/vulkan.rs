/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Creates the instance, surface, logical device and allocator for one
/// window, and hands out every GPU object. Rendering goes through the
/// immediate context, which shares the frame state with the swapchain.

use tutorial_3d_engine::tutorial3d::{GraphicsDevice, Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    Buffer as GraphicsBuffer, BufferDesc, BufferUsage, Config, DepthStencilDesc,
    DepthStencilState as GraphicsDepthStencilState, DepthStencilView as GraphicsDepthStencilView,
    DeviceContext as GraphicsDeviceContext, GraphicsDeviceStats, LiveObjectReport,
    Pipeline as GraphicsPipeline, PipelineDesc, RasterizerDesc,
    RasterizerState as GraphicsRasterizerState, RenderTargetView as GraphicsRenderTargetView,
    Sampler as GraphicsSampler, SamplerDesc, Swapchain as GraphicsSwapchain, SwapchainDesc,
    Texture as GraphicsTexture, TextureDesc, TextureFormat, TextureUsage,
};
use ash::vk;
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tutorial_3d_engine::{engine_debug, engine_info, engine_warn, engine_error, engine_err};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_device_context::{DefaultBindings, DeviceContext};
use crate::vulkan_frame::{FrameState, SharedFrameState};
use crate::vulkan_pipeline::{Pipeline, PipelineLayouts};
use crate::vulkan_render_state::{DepthStencilState, RasterizerState};
use crate::vulkan_render_target::{DepthStencilView, RenderTargetView};
use crate::vulkan_sampler::{Sampler, SamplerCache};
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::Texture;

/// Size of the constant buffer bound to empty slots
const DEFAULT_CONSTANT_BUFFER_SIZE: u64 = 256;

/// Vulkan graphics device implementation
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,

    /// Window surface, created with the device
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,

    /// Frame state shared by the swapchain and the immediate context
    frame: SharedFrameState,
    /// Set layout and pipeline layouts shared by every pipeline
    layouts: PipelineLayouts,
    /// Internal sampler cache (creates VkSampler on first use)
    sampler_cache: SamplerCache,

    context_created: bool,
    validation_enabled: bool,
    stats: GraphicsDeviceStats,

    /// Shared GPU context for all resources
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create a device presenting to `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("Failed to load Vulkan library", e))?;

            let app_name = std::ffi::CString::new(config.app_name.clone())
                .map_err(|e| init_error("Invalid application name", e))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Tutorial3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_error("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_error("Failed to get required extensions", e))?
                .to_vec();

            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_error("Failed to create debug messenger", e))?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            let window_handle = window
                .window_handle()
                .map_err(|e| init_error("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_error("Failed to create surface", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_family) = pick_physical_device(&instance, &surface_loader, surface)?;
            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned();

            // Logical device: one queue for graphics and present
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            // Wireframe needs non-solid fill modes
            let device_features = vk::PhysicalDeviceFeatures::default().fill_mode_non_solid(true);
            let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features)
                .push_next(&mut vulkan13_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("Failed to create logical device", e))?;

            let graphics_queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("Failed to create GPU allocator", e))?;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device
                .create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| init_error("Failed to create upload command pool", e))?;

            let depth_stencil_format = choose_depth_stencil_format(|format| {
                instance
                    .get_physical_device_format_properties(physical_device, format)
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            });

            let frame = FrameState::create(&device, graphics_queue, queue_family)?;
            let layouts = PipelineLayouts::create(&device)?;
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let gpu_context = Arc::new(GpuContext::new(
                device,
                Arc::new(Mutex::new(allocator)),
                graphics_queue,
                queue_family,
                upload_command_pool,
                depth_stencil_format,
                debug_utils_loader,
                debug_messenger,
            ));

            engine_info!(
                "tutorial3d::vulkan",
                "Vulkan device created on '{}' (queue family {}, depth-stencil {:?}, validation {})",
                device_name,
                queue_family,
                depth_stencil_format,
                if config.enable_validation { "on" } else { "off" }
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                surface,
                surface_loader,
                swapchain_loader,
                frame: Arc::new(Mutex::new(frame)),
                layouts,
                sampler_cache: SamplerCache::new(Arc::clone(&gpu_context)),
                context_created: false,
                validation_enabled: config.enable_validation,
                stats: GraphicsDeviceStats::default(),
                gpu_context,
            })
        }
    }

    fn default_bindings(&mut self) -> Result<DefaultBindings> {
        let constant_buffer = Buffer::create(
            Arc::clone(&self.gpu_context),
            DEFAULT_CONSTANT_BUFFER_SIZE,
            BufferUsage::Constant,
            "default constants",
        )?;
        constant_buffer.update(0, &[0u8; DEFAULT_CONSTANT_BUFFER_SIZE as usize])?;

        let texture = Texture::create(
            Arc::clone(&self.gpu_context),
            &TextureDesc {
                width: 1,
                height: 1,
                format: TextureFormat::R8G8B8A8_UNORM,
                usage: TextureUsage::Sampled,
                data: Some(vec![255; 4]),
            },
        )?;

        let sampler = self.sampler_cache.get(&SamplerDesc::default())?;

        Ok(DefaultBindings {
            constant_buffer: Arc::new(constant_buffer),
            texture: Arc::new(texture),
            sampler,
        })
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn GraphicsBuffer>> {
        if desc.size == 0 {
            engine_error!("tutorial3d::vulkan", "Cannot create an empty {:?} buffer", desc.usage);
            return Err(Error::InvalidResource("buffer size is 0".to_string()));
        }
        if let Some(data) = &desc.data {
            if data.len() as u64 > desc.size {
                engine_error!(
                    "tutorial3d::vulkan",
                    "Initial data ({} bytes) exceeds buffer size ({} bytes)",
                    data.len(),
                    desc.size
                );
                return Err(Error::InvalidResource("initial data larger than buffer".to_string()));
            }
        }

        let name = match desc.usage {
            BufferUsage::Vertex => "vertex buffer",
            BufferUsage::Index => "index buffer",
            BufferUsage::Constant => "constant buffer",
        };
        let buffer = Buffer::create(Arc::clone(&self.gpu_context), desc.size, desc.usage, name)?;
        if let Some(data) = &desc.data {
            buffer.update(0, data)?;
        }

        self.stats.buffers_created += 1;
        engine_debug!("tutorial3d::vulkan", "Created {} ({} bytes)", name, desc.size);
        Ok(Arc::new(buffer))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn GraphicsTexture>> {
        let texture = Texture::create(Arc::clone(&self.gpu_context), &desc)?;
        self.stats.textures_created += 1;
        Ok(Arc::new(texture))
    }

    fn create_sampler(&mut self, desc: SamplerDesc) -> Result<Arc<dyn GraphicsSampler>> {
        let sampler = self.sampler_cache.get(&desc)?;
        engine_debug!(
            "tutorial3d::vulkan",
            "Sampler {:?}/{:?} ready ({} distinct VkSampler(s))",
            desc.min_filter,
            desc.address_u,
            self.sampler_cache.len()
        );
        Ok(Arc::new(Sampler::new(Arc::clone(&self.gpu_context), sampler, desc)))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn GraphicsPipeline>> {
        let pipeline = Pipeline::create(Arc::clone(&self.gpu_context), &self.layouts, &desc)?;
        self.stats.pipelines_created += 1;
        Ok(Arc::new(pipeline))
    }

    fn create_depth_stencil_state(&mut self, desc: &DepthStencilDesc) -> Result<Arc<dyn GraphicsDepthStencilState>> {
        self.stats.states_created += 1;
        Ok(Arc::new(DepthStencilState::new(Arc::clone(&self.gpu_context), desc)))
    }

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<Arc<dyn GraphicsRasterizerState>> {
        self.stats.states_created += 1;
        Ok(Arc::new(RasterizerState::new(Arc::clone(&self.gpu_context), desc)))
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn GraphicsSwapchain>> {
        let has_swapchain = self
            .frame
            .lock()
            .map_err(|_| Error::BackendError("Frame state lock poisoned".to_string()))?
            .target
            .is_some();
        if has_swapchain {
            engine_error!("tutorial3d::vulkan", "The window already has a swapchain");
            return Err(Error::InitializationFailed("swapchain already created".to_string()));
        }

        let swapchain = Swapchain::new(
            Arc::clone(&self.gpu_context),
            self.physical_device,
            self.surface,
            self.surface_loader.clone(),
            self.swapchain_loader.clone(),
            Arc::clone(&self.frame),
            desc,
        )?;
        Ok(Box::new(swapchain))
    }

    fn create_render_target_view(&mut self, texture: &Arc<dyn GraphicsTexture>) -> Result<Arc<dyn GraphicsRenderTargetView>> {
        let view = RenderTargetView::new(Arc::clone(&self.gpu_context), texture)?;
        self.stats.views_created += 1;
        Ok(Arc::new(view))
    }

    fn create_depth_stencil_view(&mut self, texture: &Arc<dyn GraphicsTexture>) -> Result<Arc<dyn GraphicsDepthStencilView>> {
        let view = DepthStencilView::new(Arc::clone(&self.gpu_context), texture)?;
        self.stats.views_created += 1;
        Ok(Arc::new(view))
    }

    fn create_immediate_context(&mut self) -> Result<Box<dyn GraphicsDeviceContext>> {
        if self.context_created {
            engine_error!("tutorial3d::vulkan", "The immediate context can only be created once");
            return Err(Error::InitializationFailed("immediate context already created".to_string()));
        }

        let defaults = self.default_bindings()?;
        let context = DeviceContext::new(
            Arc::clone(&self.gpu_context),
            Arc::clone(&self.frame),
            self.layouts,
            defaults,
        );
        self.context_created = true;
        engine_debug!("tutorial3d::vulkan", "Immediate context created");
        Ok(Box::new(context))
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gpu_context
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to wait idle: {:?}", e))
        }
    }

    fn stats(&self) -> GraphicsDeviceStats {
        GraphicsDeviceStats {
            gpu_memory_used: self.gpu_context.allocated_bytes(),
            ..self.stats
        }
    }

    fn report_live_objects(&self) -> LiveObjectReport {
        self.gpu_context.live.report()
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        let debug_reports = debug_reports_enabled(self.validation_enabled);
        if debug_reports {
            let live = self.gpu_context.live.report();
            if live.is_clean() {
                engine_debug!("tutorial3d::vulkan", "No live device objects at shutdown");
            } else {
                engine_warn!("tutorial3d::vulkan", "Destroying device with {}", live);
            }
        }

        unsafe {
            let device = self.gpu_context.device.clone();

            // Wait for device to finish
            device.device_wait_idle().ok();

            // 1. Shutdown sampler cache: destroy VkSamplers + release Arc<GpuContext>
            self.sampler_cache.shutdown();

            // 2. Destroy device-owned Vulkan objects
            if let Ok(mut frame) = self.frame.lock() {
                frame.destroy();
            }
            self.layouts.destroy(&device);

            // 3. Destroy upload command pool from GpuContext
            if let Ok(mut pool) = self.gpu_context.upload_command_pool.lock() {
                if *pool != vk::CommandPool::null() {
                    device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 4. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            match Arc::get_mut(&mut self.gpu_context) {
                Some(ctx) => ManuallyDrop::drop(&mut ctx.allocator),
                None => engine_warn!(
                    "tutorial3d::vulkan",
                    "GPU objects outlive the device; their memory is not returned"
                ),
            }

            // 5. Stop routing validation messages
            crate::debug::cleanup_debug_config();

            // 6. Destroy debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (
                &self.gpu_context.debug_utils_loader,
                &self.gpu_context.debug_messenger,
            ) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 7. Destroy device, surface and instance
            device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }

        if debug_reports {
            crate::debug::print_validation_stats_report();
        }
    }
}

/// Shutdown reports (live objects, validation statistics) are debug-build only
pub(crate) fn debug_reports_enabled(validation_enabled: bool) -> bool {
    validation_enabled && cfg!(debug_assertions)
}

// ============================================================================
// Device selection
// ============================================================================

/// First Vulkan 1.3 GPU with a queue family that can both draw and present
unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, u32)> {
    let physical_devices = instance
        .enumerate_physical_devices()
        .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

    for physical_device in physical_devices {
        let properties = instance.get_physical_device_properties(physical_device);
        let name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy();
        if properties.api_version < vk::API_VERSION_1_3 {
            engine_debug!("tutorial3d::vulkan", "Skipping '{}': Vulkan 1.3 not supported", name);
            continue;
        }

        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
        let family = (0..queue_families.len() as u32).find(|&index| {
            queue_families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false)
        });

        match family {
            Some(family) => return Ok((physical_device, family)),
            None => engine_debug!("tutorial3d::vulkan", "Skipping '{}': no graphics+present queue", name),
        }
    }

    engine_error!("tutorial3d::vulkan", "No Vulkan 1.3 GPU can present to this window");
    Err(Error::InitializationFailed("No suitable Vulkan-capable GPU found".to_string()))
}

/// Packed depth-stencil format backing `D24_UNORM_S8_UINT`
///
/// Some GPUs do not expose D24S8 as an attachment; D32S8 keeps the stencil aspect.
pub(crate) fn choose_depth_stencil_format(supports_attachment: impl Fn(vk::Format) -> bool) -> vk::Format {
    [vk::Format::D24_UNORM_S8_UINT, vk::Format::D32_SFLOAT_S8_UINT]
        .into_iter()
        .find(|&format| supports_attachment(format))
        .unwrap_or(vk::Format::D32_SFLOAT_S8_UINT)
}

fn init_error(message: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!("tutorial3d::vulkan", "{}: {:?}", message, e);
    Error::InitializationFailed(format!("{}: {:?}", message, e))
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
