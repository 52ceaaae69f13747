/// SamplerCache - internal VkSampler management for the Vulkan backend
///
/// Identical sampler descriptors share one VkSampler. The samples only ever
/// need one or two, so this is extremely lightweight.

use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::tutorial3d::render::{AddressMode, Filter, Sampler as GraphicsSampler, SamplerDesc};
use tutorial_3d_engine::engine_err;
use crate::vulkan_context::{GpuContext, LiveKind};
use ash::vk;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;

/// Internal sampler cache - creates VkSampler on first use, destroys on shutdown/drop
pub(crate) struct SamplerCache {
    ctx: Option<Arc<GpuContext>>,
    cache: FxHashMap<SamplerDesc, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx: Some(ctx),
            cache: FxHashMap::default(),
        }
    }

    /// Get or create a VkSampler for the given descriptor
    pub(crate) fn get(&mut self, desc: &SamplerDesc) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(desc) {
            return Ok(sampler);
        }

        let ctx = self.ctx.as_ref().ok_or_else(|| engine_err!("tutorial3d::vulkan", "SamplerCache used after shutdown"))?;
        let sampler = Self::create_vk_sampler(ctx, desc)?;
        self.cache.insert(*desc, sampler);
        Ok(sampler)
    }

    /// Number of distinct VkSamplers created
    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    /// Destroy all cached VkSamplers and release the GpuContext reference.
    /// Must be called during VulkanGraphicsDevice::drop() while the device is still alive.
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = &self.ctx {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None); }
            }
        }
        self.ctx = None;
    }

    fn create_vk_sampler(ctx: &GpuContext, desc: &SamplerDesc) -> Result<vk::Sampler> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .mipmap_mode(mipmap_mode_to_vk(desc.mip_filter))
            .address_mode_u(address_mode_to_vk(desc.address_u))
            .address_mode_v(address_mode_to_vk(desc.address_v))
            .address_mode_w(address_mode_to_vk(desc.address_w))
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .unnormalized_coordinates(false);

        unsafe {
            ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create sampler: {:?}", e))
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        // If shutdown() was called, ctx is None and cache is empty - nothing to do.
        if let Some(ctx) = &self.ctx {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None); }
            }
        }
    }
}

/// Sampler object handed out by the device; the VkSampler belongs to the cache
pub struct Sampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
    desc: SamplerDesc,
}

impl Sampler {
    pub(crate) fn new(ctx: Arc<GpuContext>, sampler: vk::Sampler, desc: SamplerDesc) -> Self {
        ctx.live.acquire(LiveKind::Sampler);
        Self { ctx, sampler, desc }
    }
}

impl GraphicsSampler for Sampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.ctx.live.release(LiveKind::Sampler);
    }
}

pub(crate) fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode_to_vk(filter: Filter) -> vk::SamplerMipmapMode {
    match filter {
        Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
        Filter::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
    }
}
