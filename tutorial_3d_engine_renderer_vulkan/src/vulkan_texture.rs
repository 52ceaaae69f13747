/// Texture - Vulkan implementation of the Texture trait
///
/// Two kinds of texture exist:
/// - [`Texture`]: an image owned by the device (sampled or depth-stencil)
/// - [`BackBuffer`]: a handle onto the swapchain image being rendered this frame

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    Texture as GraphicsTexture, TextureDesc, TextureFormat, TextureInfo, TextureUsage,
};
use tutorial_3d_engine::{engine_error, engine_err, engine_debug};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::{GpuContext, LiveKind};
use crate::vulkan_frame::SharedFrameState;

/// Vulkan texture implementation
pub struct Texture {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Vulkan format actually used for the image
    pub(crate) vk_format: vk::Format,
    /// COLOR for sampled images, DEPTH (| STENCIL) for depth images
    pub(crate) aspect: vk::ImageAspectFlags,
    /// Current image layout, tracked by the immediate context
    pub(crate) layout: Mutex<vk::ImageLayout>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl Texture {
    /// Create the image, its view, and upload initial data for sampled textures
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        validate_desc(desc)?;

        let format = texture_format_to_vk(desc.format, ctx.depth_stencil_format);
        let (usage_flags, aspect) = match desc.usage {
            TextureUsage::Sampled => (
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
                vk::ImageAspectFlags::COLOR,
            ),
            TextureUsage::DepthStencil => (
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
                depth_aspect(desc.format),
            ),
            TextureUsage::RenderTarget => {
                return Err(Error::InvalidResource("render-target textures come from the swapchain".to_string()));
            }
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create texture image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("texture", requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    engine_error!(
                        "tutorial3d::vulkan",
                        "Texture allocation failed (size: {}x{}, format: {:?})",
                        desc.width,
                        desc.height,
                        desc.format
                    );
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on, Drop releases the image and its memory on every error path
            let mut texture = Self {
                ctx: Arc::clone(&ctx),
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                vk_format: format,
                aspect,
                layout: Mutex::new(vk::ImageLayout::UNDEFINED),
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                },
            };
            ctx.live.acquire(LiveKind::Texture);

            if let Some(allocation) = &texture.allocation {
                ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to bind texture image memory: {:?}", e))?;
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(color_or_depth_range(aspect));

            texture.view = ctx.device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create texture image view: {:?}", e))?;

            if desc.usage == TextureUsage::Sampled {
                texture.upload(desc.data.as_deref())?;
            }

            engine_debug!(
                "tutorial3d::vulkan",
                "Created {:?} texture {}x{} ({:?})",
                desc.usage,
                desc.width,
                desc.height,
                desc.format
            );
            Ok(texture)
        }
    }

    /// Copy `data` through a staging buffer and leave the image in SHADER_READ_ONLY_OPTIMAL
    fn upload(&mut self, data: Option<&[u8]>) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);
        let image = self.image;
        let extent = vk::Extent3D {
            width: self.info.width,
            height: self.info.height,
            depth: 1,
        };

        unsafe {
            let staging = match data {
                Some(bytes) => Some(StagingBuffer::create(&ctx, bytes)?),
                None => None,
            };

            let result = ctx.submit_one_shot(|command_buffer| {
                let next_layout = if staging.is_some() {
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL
                } else {
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                };
                let barrier = vk::ImageMemoryBarrier::default()
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(next_layout)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(color_or_depth_range(vk::ImageAspectFlags::COLOR))
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_access_mask(if staging.is_some() {
                        vk::AccessFlags::TRANSFER_WRITE
                    } else {
                        vk::AccessFlags::SHADER_READ
                    });
                ctx.device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    if staging.is_some() {
                        vk::PipelineStageFlags::TRANSFER
                    } else {
                        vk::PipelineStageFlags::FRAGMENT_SHADER
                    },
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[barrier],
                );

                if let Some(staging) = &staging {
                    let region = vk::BufferImageCopy::default()
                        .buffer_offset(0)
                        .buffer_row_length(0)
                        .buffer_image_height(0)
                        .image_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                        .image_extent(extent);

                    ctx.device.cmd_copy_buffer_to_image(
                        command_buffer,
                        staging.buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &[region],
                    );

                    let barrier_to_shader = vk::ImageMemoryBarrier::default()
                        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .image(image)
                        .subresource_range(color_or_depth_range(vk::ImageAspectFlags::COLOR))
                        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                        .dst_access_mask(vk::AccessFlags::SHADER_READ);
                    ctx.device.cmd_pipeline_barrier(
                        command_buffer,
                        vk::PipelineStageFlags::TRANSFER,
                        vk::PipelineStageFlags::FRAGMENT_SHADER,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[barrier_to_shader],
                    );
                }
            });

            if let Some(staging) = staging {
                staging.destroy(&ctx);
            }
            result?;
        }

        self.set_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        Ok(())
    }

    /// Current layout as last recorded by the context
    pub(crate) fn layout(&self) -> vk::ImageLayout {
        self.layout.lock().map(|layout| *layout).unwrap_or(vk::ImageLayout::UNDEFINED)
    }

    pub(crate) fn set_layout(&self, layout: vk::ImageLayout) {
        if let Ok(mut current) = self.layout.lock() {
            *current = layout;
        }
    }
}

impl GraphicsTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            // Destroy image view
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }

            // Destroy image
            self.ctx.device.destroy_image(self.image, None);
        }
        self.ctx.live.release(LiveKind::Texture);
    }
}

// ============================================================================
// Back buffer
// ============================================================================

/// Handle onto the swapchain back buffer
///
/// The image behind the handle changes every frame; the context resolves it
/// when the handle's render-target view is used. While any handle is alive
/// the swapchain refuses to resize.
pub struct BackBuffer {
    frame: SharedFrameState,
    info: TextureInfo,
}

impl BackBuffer {
    pub(crate) fn new(frame: SharedFrameState, width: u32, height: u32, format: TextureFormat) -> Result<Self> {
        frame
            .lock()
            .map_err(|_| Error::BackendError("Frame state lock poisoned".to_string()))?
            .back_buffer_refs += 1;

        Ok(Self {
            frame,
            info: TextureInfo {
                width,
                height,
                format,
                usage: TextureUsage::RenderTarget,
            },
        })
    }

    pub(crate) fn frame(&self) -> &SharedFrameState {
        &self.frame
    }
}

impl GraphicsTexture for BackBuffer {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for BackBuffer {
    fn drop(&mut self) {
        if let Ok(mut frame) = self.frame.lock() {
            frame.back_buffer_refs = frame.back_buffer_refs.saturating_sub(1);
        }
    }
}

// ============================================================================
// Staging upload buffer
// ============================================================================

struct StagingBuffer {
    buffer: vk::Buffer,
    allocation: Allocation,
}

impl StagingBuffer {
    unsafe fn create(ctx: &GpuContext, data: &[u8]) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::default()
            .size(data.len() as u64)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = ctx.device.create_buffer(&create_info, None)
            .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create staging buffer: {:?}", e))?;

        let requirements = ctx.device.get_buffer_memory_requirements(buffer);
        let allocation = match ctx.allocate("staging_buffer", requirements, gpu_allocator::MemoryLocation::CpuToGpu, true) {
            Ok(allocation) => allocation,
            Err(e) => {
                ctx.device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };

        let staging = Self { buffer, allocation };
        if let Err(e) = ctx.device.bind_buffer_memory(buffer, staging.allocation.memory(), staging.allocation.offset()) {
            staging.destroy(ctx);
            return Err(engine_err!("tutorial3d::vulkan", "Failed to bind staging buffer memory: {:?}", e));
        }

        match staging.allocation.mapped_ptr() {
            Some(ptr) => {
                std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr() as *mut u8, data.len());
                Ok(staging)
            }
            None => {
                staging.destroy(ctx);
                Err(engine_err!("tutorial3d::vulkan", "Staging buffer is not CPU-accessible"))
            }
        }
    }

    unsafe fn destroy(self, ctx: &GpuContext) {
        ctx.free(self.allocation);
        ctx.device.destroy_buffer(self.buffer, None);
    }
}

// ============================================================================
// Format conversion
// ============================================================================

fn validate_desc(desc: &TextureDesc) -> Result<()> {
    if desc.width == 0 || desc.height == 0 {
        engine_error!("tutorial3d::vulkan", "Texture size {}x{} is empty", desc.width, desc.height);
        return Err(Error::InvalidResource(format!("texture size {}x{}", desc.width, desc.height)));
    }
    match desc.usage {
        TextureUsage::RenderTarget => {
            engine_error!("tutorial3d::vulkan", "Render-target textures are provided by the swapchain");
            Err(Error::InvalidResource("render-target textures come from the swapchain".to_string()))
        }
        TextureUsage::DepthStencil if !desc.format.is_depth() => {
            engine_error!("tutorial3d::vulkan", "Depth-stencil texture needs a depth format, got {:?}", desc.format);
            Err(Error::InvalidResource(format!("{:?} is not a depth format", desc.format)))
        }
        TextureUsage::Sampled if desc.format.is_depth() => {
            engine_error!("tutorial3d::vulkan", "Sampled texture cannot use depth format {:?}", desc.format);
            Err(Error::InvalidResource(format!("{:?} cannot be sampled", desc.format)))
        }
        TextureUsage::Sampled => match &desc.data {
            Some(data) if data.len() != desc.expected_data_len() => {
                engine_error!(
                    "tutorial3d::vulkan",
                    "Texture data is {} bytes, expected {}",
                    data.len(),
                    desc.expected_data_len()
                );
                Err(Error::InvalidResource(format!(
                    "texture data is {} bytes, expected {}",
                    data.len(),
                    desc.expected_data_len()
                )))
            }
            _ => Ok(()),
        },
        TextureUsage::DepthStencil => Ok(()),
    }
}

/// Convert TextureFormat to Vulkan format
///
/// `depth_stencil_format` is the packed depth-stencil format the GPU supports.
pub(crate) fn texture_format_to_vk(format: TextureFormat, depth_stencil_format: vk::Format) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => depth_stencil_format,
    }
}

/// Convert Vulkan format to engine TextureFormat
pub(crate) fn vk_format_to_format(vk_format: vk::Format) -> Option<TextureFormat> {
    match vk_format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            Some(TextureFormat::D24_UNORM_S8_UINT)
        }
        _ => None,
    }
}

/// Aspect flags of a depth format
pub(crate) fn depth_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

/// Single mip, single layer subresource range
pub(crate) fn color_or_depth_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}
