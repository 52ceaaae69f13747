/// Buffer - Vulkan implementation of the Buffer trait
///
/// Every buffer lives in host-visible memory (CpuToGpu) and stays mapped,
/// so vertex, index and constant data are written straight through.

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{Buffer as GraphicsBuffer, BufferUsage};
use tutorial_3d_engine::{engine_error, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveKind};

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
    usage: BufferUsage,
}

impl Buffer {
    /// Create the buffer, allocate host-visible memory and bind it
    pub(crate) fn create(ctx: Arc<GpuContext>, size: u64, usage: BufferUsage, name: &str) -> Result<Self> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(buffer_usage_to_vk(usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate(name, requirements, gpu_allocator::MemoryLocation::CpuToGpu, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("tutorial3d::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            ctx.live.acquire(LiveKind::Buffer);
            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size,
                usage,
            })
        }
    }
}

impl GraphicsBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_error!(
                "tutorial3d::vulkan",
                "Buffer update out of range: offset {} + {} bytes > size {}",
                offset,
                data.len(),
                self.size
            );
            return Err(Error::InvalidResource(format!(
                "update of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                self.size
            )));
        }

        unsafe {
            if let Some(allocation) = &self.allocation {
                // Map memory and copy data
                let mapped_ptr = allocation
                    .mapped_ptr()
                    .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
                    .as_ptr() as *mut u8;

                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    mapped_ptr.add(offset as usize),
                    data.len(),
                );

                Ok(())
            } else {
                engine_error!("tutorial3d::vulkan", "Buffer update failed: no GPU allocation");
                Err(Error::BackendError("Buffer has no allocation".to_string()))
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
        self.ctx.live.release(LiveKind::Buffer);
    }
}

/// Convert BufferUsage to Vulkan usage flags
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Constant => vk::BufferUsageFlags::UNIFORM_BUFFER,
    }
}
