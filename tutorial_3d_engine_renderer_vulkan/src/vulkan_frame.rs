/// Frame state shared by the immediate context and the swapchain
///
/// One frame is in flight at a time. The context records into the frame's
/// command buffer; the swapchain submits it on present. Recording starts
/// lazily with the first command after the previous submit, after waiting
/// on the frame fence, so host writes to mapped buffers never race the GPU.

use ash::vk;
use std::sync::{Arc, Mutex};
use tutorial_3d_engine::tutorial3d::{Error, Result};
use tutorial_3d_engine::{engine_debug, engine_error, engine_err, engine_trace};

/// Shared handle on the frame state
pub(crate) type SharedFrameState = Arc<Mutex<FrameState>>;

/// Descriptor sets available per frame
const MAX_DESCRIPTOR_SETS_PER_FRAME: u32 = 4096;

/// Swapchain images and the per-image objects that go with them
pub(crate) struct SwapchainTarget {
    pub(crate) loader: ash::khr::swapchain::Device,
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
    pub(crate) views: Vec<vk::ImageView>,
    /// Layout of each image as recorded so far
    pub(crate) layouts: Vec<vk::ImageLayout>,
    /// One semaphore per swapchain image (for present)
    pub(crate) render_finished: Vec<vk::Semaphore>,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl SwapchainTarget {
    /// Destroy views, semaphores and (unless retired into a new swapchain) the swapchain
    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        for &view in &self.views {
            device.destroy_image_view(view, None);
        }
        for &semaphore in &self.render_finished {
            device.destroy_semaphore(semaphore, None);
        }
        self.views.clear();
        self.render_finished.clear();
        self.images.clear();
        self.layouts.clear();
        if self.swapchain != vk::SwapchainKHR::null() {
            self.loader.destroy_swapchain(self.swapchain, None);
            self.swapchain = vk::SwapchainKHR::null();
        }
    }
}

/// Per-frame command recording and synchronization state
pub(crate) struct FrameState {
    device: ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    in_flight_fence: vk::Fence,
    /// One semaphore for acquire (one frame in flight)
    image_available: vk::Semaphore,
    /// Pool for the descriptor sets written during the frame (reset every frame)
    pub(crate) descriptor_pool: vk::DescriptorPool,

    /// The command buffer is between begin and end
    recording: bool,
    /// A submit is pending on `in_flight_fence`
    submitted: bool,
    /// Inside vkCmdBeginRendering
    rendering: bool,
    /// Image index acquired for this frame
    pub(crate) acquired: Option<u32>,
    /// The acquire semaphore must be waited on by the next submit
    acquire_wait_pending: bool,

    /// Swapchain images, set while a swapchain exists
    pub(crate) target: Option<SwapchainTarget>,
    /// Live back buffer handles (and views holding them)
    pub(crate) back_buffer_refs: usize,
    /// Frames presented so far
    pub(crate) frame_index: u64,
}

impl FrameState {
    /// Create the command pool, command buffer, fence, acquire semaphore and descriptor pool
    pub(crate) fn create(device: &ash::Device, queue: vk::Queue, queue_family: u32) -> Result<Self> {
        unsafe {
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);

            let command_pool = device.create_command_pool(&pool_create_info, None)
                .map_err(|e| init_error("Failed to create frame command pool", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = device.allocate_command_buffers(&allocate_info)
                .map_err(|e| init_error("Failed to allocate frame command buffer", e))?[0];

            let in_flight_fence = device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| init_error("Failed to create frame fence", e))?;

            let image_available = device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| init_error("Failed to create image-available semaphore", e))?;

            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: MAX_DESCRIPTOR_SETS_PER_FRAME * 3,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::SAMPLED_IMAGE,
                    descriptor_count: MAX_DESCRIPTOR_SETS_PER_FRAME,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::SAMPLER,
                    descriptor_count: MAX_DESCRIPTOR_SETS_PER_FRAME,
                },
            ];
            let descriptor_pool_info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets(MAX_DESCRIPTOR_SETS_PER_FRAME);

            let descriptor_pool = device.create_descriptor_pool(&descriptor_pool_info, None)
                .map_err(|e| init_error("Failed to create frame descriptor pool", e))?;

            Ok(Self {
                device: device.clone(),
                queue,
                command_pool,
                command_buffer,
                in_flight_fence,
                image_available,
                descriptor_pool,
                recording: false,
                submitted: false,
                rendering: false,
                acquired: None,
                acquire_wait_pending: false,
                target: None,
                back_buffer_refs: 0,
                frame_index: 0,
            })
        }
    }

    /// Command buffer of the current frame, starting a new recording if needed
    ///
    /// The flag is true when a new recording was started (the previous frame
    /// has completed on the GPU).
    pub(crate) fn begin(&mut self) -> Result<(vk::CommandBuffer, bool)> {
        if self.recording {
            return Ok((self.command_buffer, false));
        }

        self.wait()?;

        unsafe {
            self.device
                .reset_descriptor_pool(self.descriptor_pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to reset frame descriptor pool: {:?}", e))?;

            self.device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to reset frame command pool: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to begin frame command buffer: {:?}", e))?;
        }

        self.recording = true;
        Ok((self.command_buffer, true))
    }

    pub(crate) fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub(crate) fn set_rendering(&mut self) {
        self.rendering = true;
    }

    /// Close the active dynamic rendering scope, if any
    pub(crate) fn end_rendering(&mut self) {
        if self.rendering {
            unsafe {
                self.device.cmd_end_rendering(self.command_buffer);
            }
            self.rendering = false;
        }
    }

    /// Acquire the next swapchain image for this frame (once per frame)
    pub(crate) fn acquire(&mut self) -> Result<u32> {
        if let Some(index) = self.acquired {
            return Ok(index);
        }

        let target = self.target.as_mut().ok_or_else(|| {
            engine_error!("tutorial3d::vulkan", "No swapchain to acquire a back buffer from");
            Error::BackBufferUnavailable("no swapchain".to_string())
        })?;

        let (index, suboptimal) = unsafe {
            target
                .loader
                .acquire_next_image(target.swapchain, u64::MAX, self.image_available, vk::Fence::null())
                .map_err(|e| {
                    if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                        engine_debug!("tutorial3d::vulkan", "Swapchain out of date during acquire");
                        Error::BackBufferUnavailable("swapchain out of date".to_string())
                    } else {
                        engine_err!("tutorial3d::vulkan", "Failed to acquire next swapchain image: {:?}", e)
                    }
                })?
        };
        if suboptimal {
            engine_trace!("tutorial3d::vulkan", "Acquired image {} from a suboptimal swapchain", index);
        }

        // Previous contents are discarded
        target.layouts[index as usize] = vk::ImageLayout::UNDEFINED;
        self.acquired = Some(index);
        self.acquire_wait_pending = true;
        Ok(index)
    }

    /// End recording and submit, optionally signaling `signal` for present
    pub(crate) fn submit(&mut self, signal: Option<vk::Semaphore>) -> Result<()> {
        if !self.recording {
            return Ok(());
        }
        self.end_rendering();

        unsafe {
            self.recording = false;
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to end frame command buffer: {:?}", e))?;

            let wait_semaphores = [self.image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::TRANSFER];
            let command_buffers = [self.command_buffer];
            let signal_semaphores: Vec<vk::Semaphore> = signal.into_iter().collect();

            let mut submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            if self.acquire_wait_pending {
                submit_info = submit_info
                    .wait_semaphores(&wait_semaphores)
                    .wait_dst_stage_mask(&wait_stages);
            }

            self.device
                .reset_fences(&[self.in_flight_fence])
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to reset frame fence: {:?}", e))?;

            self.device
                .queue_submit(self.queue, &[submit_info], self.in_flight_fence)
                .map_err(|e| frame_error(e, "submit frame"))?;
        }

        self.submitted = true;
        self.acquire_wait_pending = false;
        Ok(())
    }

    /// Wait for the submitted frame to complete on the GPU
    pub(crate) fn wait(&mut self) -> Result<()> {
        if self.submitted {
            unsafe {
                self.device
                    .wait_for_fences(&[self.in_flight_fence], true, u64::MAX)
                    .map_err(|e| frame_error(e, "wait for frame fence"))?;
            }
            self.submitted = false;
        }
        Ok(())
    }

    /// Submit everything recorded so far and wait for it
    ///
    /// A pending acquire is consumed by an empty submit so the acquire
    /// semaphore can be reused.
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.acquire_wait_pending && !self.recording {
            self.begin()?;
        }
        self.submit(None)?;
        self.wait()
    }

    /// Record a layout transition for swapchain image `index`
    pub(crate) fn transition_swapchain_image(&mut self, index: u32, new_layout: vk::ImageLayout) -> Result<()> {
        let command_buffer = self.command_buffer;
        let device = self.device.clone();
        let target = self.target.as_mut().ok_or_else(|| {
            Error::BackBufferUnavailable("no swapchain".to_string())
        })?;
        let slot = index as usize;
        let old_layout = target.layouts[slot];
        if old_layout != new_layout {
            image_barrier(&device, command_buffer, target.images[slot], vk::ImageAspectFlags::COLOR, old_layout, new_layout);
            target.layouts[slot] = new_layout;
        }
        Ok(())
    }

    /// Forget the acquired image (after present or when the swapchain is rebuilt)
    pub(crate) fn release_acquired(&mut self) {
        self.acquired = None;
    }

    /// Destroy every Vulkan object owned by the frame
    pub(crate) unsafe fn destroy(&mut self) {
        if let Some(mut target) = self.target.take() {
            target.destroy(&self.device);
        }
        self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        self.device.destroy_semaphore(self.image_available, None);
        self.device.destroy_fence(self.in_flight_fence, None);
        self.device.destroy_command_pool(self.command_pool, None);
    }
}

/// Record a pipeline barrier moving `image` from `old_layout` to `new_layout`
pub(crate) fn image_barrier(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, src_stage) = layout_access(old_layout);
    let (dst_access, dst_stage) = layout_access(new_layout);

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Access mask and pipeline stage touching an image in `layout`
pub(crate) fn layout_access(layout: vk::ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => (
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        ),
        _ => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
    }
}

fn init_error(message: &str, e: vk::Result) -> Error {
    engine_error!("tutorial3d::vulkan", "{}: {:?}", message, e);
    Error::InitializationFailed(format!("{}: {:?}", message, e))
}

/// Map a per-frame Vulkan failure, keeping device loss distinct from other backend errors
pub(crate) fn frame_error(result: vk::Result, action: &str) -> Error {
    if result == vk::Result::ERROR_DEVICE_LOST {
        engine_error!("tutorial3d::vulkan", "Device lost during {}", action);
        Error::DeviceLost
    } else {
        engine_err!("tutorial3d::vulkan", "Failed to {}: {:?}", action, result)
    }
}
