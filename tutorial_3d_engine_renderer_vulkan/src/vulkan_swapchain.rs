/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the VkSwapchainKHR (through the shared frame state) and handles
/// presentation and buffer resizing. The surface belongs to the device.

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    Swapchain as GraphicsSwapchain, SwapchainDesc, Texture as GraphicsTexture, TextureFormat,
};
use tutorial_3d_engine::{engine_error, engine_err, engine_debug, engine_info, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_frame::{frame_error, SharedFrameState, SwapchainTarget, FrameState};
use crate::vulkan_texture::{BackBuffer, texture_format_to_vk, vk_format_to_format};

/// Vulkan swapchain implementation
pub struct Swapchain {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Physical device for capabilities queries
    physical_device: vk::PhysicalDevice,
    /// Surface (owned by the device)
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    /// Frame state shared with the immediate context
    frame: SharedFrameState,
    /// Surface format chosen at creation, kept across resizes
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    requested_buffer_count: u32,
    extent: vk::Extent2D,
    format: TextureFormat,
    buffer_count: u32,
}

impl Swapchain {
    /// Create the swapchain and publish its images to the frame state
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        swapchain_loader: ash::khr::swapchain::Device,
        frame: SharedFrameState,
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        unsafe {
            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_error!("tutorial3d::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;

            let wanted = texture_format_to_vk(desc.format, vk::Format::UNDEFINED);
            let surface_format = choose_surface_format(&surface_formats, wanted).ok_or_else(|| {
                engine_error!("tutorial3d::vulkan", "Surface reports no usable color format");
                Error::InitializationFailed("no usable surface format".to_string())
            })?;
            if surface_format.format != wanted {
                engine_warn!(
                    "tutorial3d::vulkan",
                    "Surface does not support {:?}, using {:?}",
                    desc.format,
                    surface_format.format
                );
            }

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    engine_error!("tutorial3d::vulkan", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;
            let present_mode = choose_present_mode(&present_modes, desc.vsync);

            let mut swapchain = Self {
                ctx,
                physical_device,
                surface,
                surface_loader,
                swapchain_loader,
                frame,
                surface_format,
                present_mode,
                requested_buffer_count: desc.buffer_count,
                extent: vk::Extent2D { width: desc.width, height: desc.height },
                format: vk_format_to_format(surface_format.format).unwrap_or(desc.format),
                buffer_count: 0,
            };

            let target = swapchain
                .create_target(desc.width, desc.height, vk::SwapchainKHR::null())
                .map_err(|(_, e)| e)?;
            swapchain.lock_frame()?.target = Some(target);

            engine_info!(
                "tutorial3d::vulkan",
                "Swapchain created: {}x{}, {} buffers, {:?}, {:?}",
                swapchain.extent.width,
                swapchain.extent.height,
                swapchain.buffer_count,
                swapchain.surface_format.format,
                swapchain.present_mode
            );
            Ok(swapchain)
        }
    }

    fn lock_frame(&self) -> Result<std::sync::MutexGuard<'_, FrameState>> {
        self.frame
            .lock()
            .map_err(|_| Error::BackendError("Frame state lock poisoned".to_string()))
    }

    /// Build a swapchain (retiring `old_swapchain`), its image views and present semaphores
    unsafe fn create_target(
        &mut self,
        width: u32,
        height: u32,
        old_swapchain: vk::SwapchainKHR,
    ) -> std::result::Result<SwapchainTarget, (RebuildFailure, Error)> {
        let device = &self.ctx.device;

        let surface_capabilities = self.surface_loader
            .get_physical_device_surface_capabilities(self.physical_device, self.surface)
            .map_err(|e| {
                engine_error!("tutorial3d::vulkan", "Failed to get surface capabilities: {:?}", e);
                let error = Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e));
                (RebuildFailure::BeforeCreate, error)
            })?;

        let extent = choose_extent(&surface_capabilities, width, height);
        let image_count = choose_image_count(&surface_capabilities, self.requested_buffer_count);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = self.swapchain_loader
            .create_swapchain(&swapchain_create_info, None)
            .map_err(|e| {
                engine_error!("tutorial3d::vulkan", "Failed to create swapchain: {:?}", e);
                let error = Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e));
                (RebuildFailure::AfterCreate, error)
            })?;

        let mut target = SwapchainTarget {
            loader: self.swapchain_loader.clone(),
            swapchain,
            images: Vec::new(),
            views: Vec::new(),
            layouts: Vec::new(),
            render_finished: Vec::new(),
            format: self.surface_format.format,
            extent,
        };

        if let Err(e) = self.populate_target(&mut target) {
            target.destroy(device);
            return Err((RebuildFailure::AfterCreate, e));
        }

        self.extent = extent;
        self.buffer_count = target.images.len() as u32;
        Ok(target)
    }

    unsafe fn populate_target(&self, target: &mut SwapchainTarget) -> Result<()> {
        let device = &self.ctx.device;

        target.images = self.swapchain_loader
            .get_swapchain_images(target.swapchain)
            .map_err(|e| {
                engine_error!("tutorial3d::vulkan", "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;
        target.layouts = vec![vk::ImageLayout::UNDEFINED; target.images.len()];

        for &image in &target.images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(target.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = device.create_image_view(&create_info, None)
                .map_err(|e| {
                    engine_error!("tutorial3d::vulkan", "Failed to create swapchain image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })?;
            target.views.push(view);

            let semaphore = device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| {
                    engine_error!("tutorial3d::vulkan", "Failed to create render-finished semaphore: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                })?;
            target.render_finished.push(semaphore);
        }

        Ok(())
    }
}

impl GraphicsSwapchain for Swapchain {
    fn back_buffer(&mut self) -> Result<Arc<dyn GraphicsTexture>> {
        let back_buffer = BackBuffer::new(
            Arc::clone(&self.frame),
            self.extent.width,
            self.extent.height,
            self.format,
        )?;
        Ok(Arc::new(back_buffer))
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()> {
        let frame = Arc::clone(&self.frame);
        let mut frame = frame
            .lock()
            .map_err(|_| Error::BackendError("Frame state lock poisoned".to_string()))?;

        if frame.back_buffer_refs > 0 {
            engine_error!(
                "tutorial3d::vulkan",
                "Cannot resize swapchain buffers: {} back buffer reference(s) still alive",
                frame.back_buffer_refs
            );
            return Err(Error::InvalidResource(format!(
                "{} back buffer reference(s) still alive",
                frame.back_buffer_refs
            )));
        }

        frame.flush()?;
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to wait idle before swapchain resize: {:?}", e))?;
        }
        frame.release_acquired();

        let previous = frame.target.take();
        let previous_extent = self.extent;
        let old_swapchain = previous.as_ref().map_or(vk::SwapchainKHR::null(), |t| t.swapchain);

        let (failure, error) = match unsafe { self.create_target(width, height, old_swapchain) } {
            Ok(target) => {
                if let Some(mut old_target) = previous {
                    unsafe { old_target.destroy(&self.ctx.device) };
                }
                engine_debug!(
                    "tutorial3d::vulkan",
                    "Swapchain buffers resized to {}x{} (requested {}x{})",
                    target.extent.width,
                    target.extent.height,
                    width,
                    height
                );
                frame.target = Some(target);
                return Ok(());
            }
            Err(failed) => failed,
        };

        match ResizeRecovery::after(previous.is_some(), failure) {
            ResizeRecovery::KeepPrevious => {
                engine_warn!(
                    "tutorial3d::vulkan",
                    "Swapchain resize to {}x{} failed, keeping {}x{}",
                    width,
                    height,
                    previous_extent.width,
                    previous_extent.height
                );
                frame.target = previous;
            }
            ResizeRecovery::RebuildAtPreviousSize => {
                let rebuilt = unsafe {
                    self.create_target(previous_extent.width, previous_extent.height, vk::SwapchainKHR::null())
                };
                if let Some(mut retired) = previous {
                    unsafe { retired.destroy(&self.ctx.device) };
                }
                match rebuilt {
                    Ok(target) => {
                        engine_warn!(
                            "tutorial3d::vulkan",
                            "Swapchain resize to {}x{} failed, rebuilt at {}x{}",
                            width,
                            height,
                            target.extent.width,
                            target.extent.height
                        );
                        frame.target = Some(target);
                    }
                    Err((_, e)) => {
                        engine_error!("tutorial3d::vulkan", "No swapchain until the next successful resize: {}", e);
                    }
                }
            }
            ResizeRecovery::NoSwapchain => {
                engine_error!("tutorial3d::vulkan", "No swapchain until the next successful resize");
            }
        }
        Err(error)
    }

    fn present(&mut self, _sync_interval: u32) -> Result<()> {
        let mut frame = self.lock_frame()?;

        frame.begin()?;
        let index = frame.acquire()?;
        frame.end_rendering();
        frame.transition_swapchain_image(index, vk::ImageLayout::PRESENT_SRC_KHR)?;

        let (swapchain, render_finished) = match &frame.target {
            Some(target) => (target.swapchain, target.render_finished[index as usize]),
            None => return Err(Error::BackBufferUnavailable("no swapchain".to_string())),
        };

        frame.submit(Some(render_finished))?;
        frame.release_acquired();
        frame.frame_index += 1;

        unsafe {
            let swapchains = [swapchain];
            let image_indices = [index];
            let wait_semaphores = [render_finished];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) {
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                    engine_debug!("tutorial3d::vulkan", "Swapchain suboptimal during present");
                    Ok(())
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    engine_debug!("tutorial3d::vulkan", "Swapchain out of date during present");
                    Ok(())
                }
                Err(e) => Err(frame_error(e, "present swapchain image")),
            }
        }
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        if let Ok(mut frame) = self.frame.lock() {
            frame.flush().ok();
            frame.release_acquired();
            unsafe {
                // Wait for device to finish
                self.ctx.device.device_wait_idle().ok();
                if let Some(mut target) = frame.target.take() {
                    target.destroy(&self.ctx.device);
                }
            }
        }
    }
}

// ============================================================================
// Resize recovery
// ============================================================================

/// How far a swapchain rebuild got before it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RebuildFailure {
    /// Failed before `vkCreateSwapchainKHR`; the old swapchain is untouched
    BeforeCreate,
    /// `vkCreateSwapchainKHR` ran, which retires the old swapchain even on failure
    AfterCreate,
}

/// What a failed resize leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResizeRecovery {
    /// The previous swapchain still acquires images; put it back
    KeepPrevious,
    /// The previous swapchain is retired; build a new one at its size without it
    RebuildAtPreviousSize,
    /// There was nothing to fall back to; the next resize starts fresh
    NoSwapchain,
}

impl ResizeRecovery {
    pub(crate) fn after(had_previous: bool, failure: RebuildFailure) -> Self {
        match (had_previous, failure) {
            (false, _) => ResizeRecovery::NoSwapchain,
            (true, RebuildFailure::BeforeCreate) => ResizeRecovery::KeepPrevious,
            (true, RebuildFailure::AfterCreate) => ResizeRecovery::RebuildAtPreviousSize,
        }
    }
}

// ============================================================================
// Surface property selection
// ============================================================================

/// Requested format when available, otherwise the first 8-bit BGRA/RGBA format, otherwise the first one
pub(crate) fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    wanted: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == wanted)
        .or_else(|| formats.iter().find(|f| vk_format_to_format(f.format).is_some()))
        .or_else(|| formats.first())
        .copied()
}

/// FIFO with vsync; otherwise MAILBOX, then IMMEDIATE, then FIFO (always supported)
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Surface extent when fixed by the window system, otherwise the requested size clamped to the limits
pub(crate) fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// Requested buffer count clamped to the surface limits (`max_image_count` 0 means unbounded)
pub(crate) fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR, requested: u32) -> u32 {
    let count = requested.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}
