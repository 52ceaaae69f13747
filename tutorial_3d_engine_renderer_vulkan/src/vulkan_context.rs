/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
/// - Command pool for one-shot upload operations
/// - Live object counters backing `report_live_objects`

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tutorial_3d_engine::tutorial3d::{Error, Result};
use tutorial_3d_engine::tutorial3d::render::LiveObjectReport;
use tutorial_3d_engine::{engine_error, engine_err};

/// Category of a device object tracked by [`LiveObjects`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiveKind {
    Buffer,
    Texture,
    Sampler,
    Pipeline,
    DepthStencilState,
    RasterizerState,
    RenderTargetView,
    DepthStencilView,
}

/// Atomic counters of objects created and not yet dropped
#[derive(Default)]
pub(crate) struct LiveObjects {
    buffers: AtomicU32,
    textures: AtomicU32,
    samplers: AtomicU32,
    pipelines: AtomicU32,
    depth_stencil_states: AtomicU32,
    rasterizer_states: AtomicU32,
    render_target_views: AtomicU32,
    depth_stencil_views: AtomicU32,
}

impl LiveObjects {
    fn counter(&self, kind: LiveKind) -> &AtomicU32 {
        match kind {
            LiveKind::Buffer => &self.buffers,
            LiveKind::Texture => &self.textures,
            LiveKind::Sampler => &self.samplers,
            LiveKind::Pipeline => &self.pipelines,
            LiveKind::DepthStencilState => &self.depth_stencil_states,
            LiveKind::RasterizerState => &self.rasterizer_states,
            LiveKind::RenderTargetView => &self.render_target_views,
            LiveKind::DepthStencilView => &self.depth_stencil_views,
        }
    }

    pub(crate) fn acquire(&self, kind: LiveKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn release(&self, kind: LiveKind) {
        self.counter(kind).fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn report(&self) -> LiveObjectReport {
        LiveObjectReport {
            buffers: self.buffers.load(Ordering::Relaxed),
            textures: self.textures.load(Ordering::Relaxed),
            samplers: self.samplers.load(Ordering::Relaxed),
            pipelines: self.pipelines.load(Ordering::Relaxed),
            depth_stencil_states: self.depth_stencil_states.load(Ordering::Relaxed),
            rasterizer_states: self.rasterizer_states.load(Ordering::Relaxed),
            render_target_views: self.render_target_views.load(Ordering::Relaxed),
            depth_stencil_views: self.depth_stencil_views.load(Ordering::Relaxed),
        }
    }
}

/// Shared GPU context for all Vulkan resources.
///
/// This struct is shared (via `Arc`) by all GPU resources (textures, buffers, etc.)
/// to avoid duplicating device/allocator/queue references in each resource.
///
/// Note: Device and instance destruction is handled by VulkanGraphicsDevice::drop()
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission (also used for present)
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Format backing `TextureFormat::D24_UNORM_S8_UINT` on this GPU
    pub(crate) depth_stencil_format: vk::Format,

    /// Objects alive right now
    pub(crate) live: LiveObjects,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    /// Create a new GPU context
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        depth_stencil_format: vk::Format,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            depth_stencil_format,
            live: LiveObjects::default(),
            debug_utils_loader,
            debug_messenger,
        }
    }

    /// Record commands into a one-shot command buffer, submit, and wait for completion
    pub(crate) fn submit_one_shot(&self, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            let result = self.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to begin upload command buffer: {:?}", e))
                .and_then(|_| {
                    record(command_buffer);
                    self.device.end_command_buffer(command_buffer)
                        .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to end upload command buffer: {:?}", e))
                })
                .and_then(|_| {
                    let command_buffers = [command_buffer];
                    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                    self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                        .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to submit upload: {:?}", e))
                })
                .and_then(|_| {
                    self.device.queue_wait_idle(self.graphics_queue)
                        .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to wait for upload: {:?}", e))
                });

            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    /// Allocate GPU memory for a buffer or image, mapping allocation failure to `OutOfMemory`
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: gpu_allocator::MemoryLocation,
        linear: bool,
    ) -> Result<gpu_allocator::vulkan::Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator lock poisoned".to_string()))?;

        allocator
            .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|_e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(
                    "tutorial3d::vulkan",
                    "Out of GPU memory for {} (required: {:.2} MB)",
                    name,
                    size_mb
                );
                Error::OutOfMemory
            })
    }

    /// Return an allocation to the allocator; never fails during teardown
    pub(crate) fn free(&self, allocation: gpu_allocator::vulkan::Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Bytes currently allocated from the GPU heaps
    pub(crate) fn allocated_bytes(&self) -> u64 {
        self.allocator
            .lock()
            .map(|allocator| allocator.generate_report().total_allocated_bytes)
            .unwrap_or(0)
    }
}
