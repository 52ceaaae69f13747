/// DeviceContext - Vulkan implementation of the immediate context
///
/// Bindings are kept on the host and flushed into the frame command buffer
/// at draw time. Clears are recorded outside dynamic rendering; the
/// rendering scope opens lazily on the first draw after the targets change.
/// Every object referenced by recorded commands is retained until the GPU
/// has finished the recording.

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    Buffer as GraphicsBuffer, BufferUsage, ClearFlags, DepthStencilDesc,
    DepthStencilState as GraphicsDepthStencilState, DepthStencilView as GraphicsDepthStencilView,
    DeviceContext as GraphicsDeviceContext, IndexType, OverlayDrawData, Pipeline as GraphicsPipeline,
    RasterizerState as GraphicsRasterizerState, RenderTargetView as GraphicsRenderTargetView,
    Sampler as GraphicsSampler, Texture as GraphicsTexture, TextureUsage, Viewport,
    MAX_CONSTANT_BUFFER_SLOTS, MAX_SAMPLER_SLOTS, MAX_TEXTURE_SLOTS,
};
use tutorial_3d_engine::{engine_error, engine_err, engine_debug};
use ash::vk;
use std::sync::{Arc, MutexGuard};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame::{image_barrier, FrameState, SharedFrameState};
use crate::vulkan_overlay::OverlayRenderer;
use crate::vulkan_pipeline::{Pipeline, PipelineLayouts, SAMPLER_BINDING, TEXTURE_BINDING};
use crate::vulkan_render_state::{
    compare_op_to_vk, DepthStencilState, RasterizerState, DEFAULT_CULL_MODE, DEFAULT_FRONT_FACE,
};
use crate::vulkan_render_target::{DepthStencilView, RenderTargetView};
use crate::vulkan_sampler::Sampler;
use crate::vulkan_texture::{color_or_depth_range, Texture};

/// Object kept alive until the recording that references it completes
pub(crate) type Retained = Box<dyn Send + Sync>;

/// Attachments of the open rendering scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RenderingTarget {
    pub(crate) color_format: vk::Format,
    /// UNDEFINED without a depth target
    pub(crate) depth_format: vk::Format,
    pub(crate) has_stencil: bool,
    pub(crate) extent: vk::Extent2D,
}

/// Resources bound to slots the application left empty
pub(crate) struct DefaultBindings {
    /// Zero-filled constant buffer
    pub(crate) constant_buffer: Arc<Buffer>,
    /// 1x1 opaque white texture
    pub(crate) texture: Arc<Texture>,
    /// Linear, wrapping sampler (owned by the device sampler cache)
    pub(crate) sampler: vk::Sampler,
}

/// Vulkan immediate context
pub struct DeviceContext {
    ctx: Arc<GpuContext>,
    frame: SharedFrameState,
    layouts: PipelineLayouts,
    defaults: DefaultBindings,
    overlay: OverlayRenderer,

    // Output targets
    color_target: Option<Arc<dyn GraphicsRenderTargetView>>,
    depth_target: Option<Arc<dyn GraphicsDepthStencilView>>,
    viewport: Option<Viewport>,

    // Pipeline and state
    pipeline: Option<Arc<dyn GraphicsPipeline>>,
    depth_stencil_state: Option<Arc<dyn GraphicsDepthStencilState>>,
    rasterizer_state: Option<Arc<dyn GraphicsRasterizerState>>,

    // Input assembly and shader resources
    vertex_buffer: Option<(Arc<dyn GraphicsBuffer>, u64)>,
    index_buffer: Option<(Arc<dyn GraphicsBuffer>, IndexType)>,
    constant_buffers: [Option<Arc<dyn GraphicsBuffer>>; MAX_CONSTANT_BUFFER_SLOTS as usize],
    texture: Option<Arc<dyn GraphicsTexture>>,
    sampler: Option<Arc<dyn GraphicsSampler>>,

    // What must be re-recorded before the next draw
    pipeline_dirty: bool,
    state_dirty: bool,
    vertex_buffer_dirty: bool,
    index_buffer_dirty: bool,
    descriptors_dirty: bool,

    retained: Vec<Retained>,
    draw_calls: u32,
}

impl DeviceContext {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        frame: SharedFrameState,
        layouts: PipelineLayouts,
        defaults: DefaultBindings,
    ) -> Self {
        let overlay = OverlayRenderer::new(Arc::clone(&ctx), layouts.overlay_layout);
        Self {
            ctx,
            frame,
            layouts,
            defaults,
            overlay,
            color_target: None,
            depth_target: None,
            viewport: None,
            pipeline: None,
            depth_stencil_state: None,
            rasterizer_state: None,
            vertex_buffer: None,
            index_buffer: None,
            constant_buffers: Default::default(),
            texture: None,
            sampler: None,
            pipeline_dirty: true,
            state_dirty: true,
            vertex_buffer_dirty: true,
            index_buffer_dirty: true,
            descriptors_dirty: true,
            retained: Vec::new(),
            draw_calls: 0,
        }
    }

    fn lock_frame(frame: &SharedFrameState) -> Result<MutexGuard<'_, FrameState>> {
        frame
            .lock()
            .map_err(|_| Error::BackendError("Frame state lock poisoned".to_string()))
    }

    fn mark_all_dirty(&mut self) {
        self.pipeline_dirty = true;
        self.state_dirty = true;
        self.vertex_buffer_dirty = true;
        self.index_buffer_dirty = true;
        self.descriptors_dirty = true;
    }

    /// Command buffer of the current recording
    ///
    /// A new recording means the GPU finished the previous one, so retained
    /// objects are released and the command buffer state starts empty.
    fn begin(&mut self, frame: &mut FrameState) -> Result<vk::CommandBuffer> {
        let (command_buffer, new_recording) = frame.begin()?;
        if new_recording {
            self.retained.clear();
            self.overlay.reset();
            self.mark_all_dirty();
        }
        Ok(command_buffer)
    }

    fn check_frame(&self, frame: &SharedFrameState) -> Result<()> {
        if Arc::ptr_eq(frame, &self.frame) {
            Ok(())
        } else {
            engine_error!("tutorial3d::vulkan", "Back buffer belongs to another device");
            Err(Error::InvalidResource("back buffer belongs to another device".to_string()))
        }
    }

    /// Open the rendering scope on the bound targets if it is not open yet
    fn ensure_rendering(&mut self, frame: &mut FrameState, command_buffer: vk::CommandBuffer) -> Result<RenderingTarget> {
        let color_target = self.color_target.clone().ok_or_else(|| {
            engine_error!("tutorial3d::vulkan", "Draw without a bound render target");
            Error::InvalidResource("no render target bound".to_string())
        })?;
        let back_buffer = color_target
            .as_any()
            .downcast_ref::<RenderTargetView>()
            .and_then(RenderTargetView::back_buffer)
            .ok_or_else(|| Error::InvalidResource("render target is not a back buffer view".to_string()))?;
        self.check_frame(back_buffer.frame())?;

        let index = frame.acquire()?;
        let (image_view, color_format, extent) = match &frame.target {
            Some(target) => (target.views[index as usize], target.format, target.extent),
            None => return Err(Error::BackBufferUnavailable("no swapchain".to_string())),
        };

        let depth_texture = self.depth_target.as_ref().map(|view| Arc::clone(view.texture()));
        let depth = depth_texture
            .as_ref()
            .and_then(|texture| texture.as_any().downcast_ref::<Texture>());

        let target = RenderingTarget {
            color_format,
            depth_format: depth.map_or(vk::Format::UNDEFINED, |texture| texture.vk_format),
            has_stencil: depth.is_some_and(|texture| texture.aspect.contains(vk::ImageAspectFlags::STENCIL)),
            extent,
        };

        if frame.is_rendering() {
            return Ok(target);
        }

        if let Some(texture) = depth {
            if texture.info.width < extent.width || texture.info.height < extent.height {
                engine_error!(
                    "tutorial3d::vulkan",
                    "Depth target {}x{} is smaller than the back buffer {}x{}",
                    texture.info.width,
                    texture.info.height,
                    extent.width,
                    extent.height
                );
                return Err(Error::InvalidResource("depth target smaller than render target".to_string()));
            }
        }

        frame.transition_swapchain_image(index, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)?;
        if let Some(texture) = depth {
            transition_texture(&self.ctx.device, command_buffer, texture, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        }

        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::LOAD)
            .store_op(vk::AttachmentStoreOp::STORE)];

        let depth_attachment = depth.map(|texture| {
            vk::RenderingAttachmentInfo::default()
                .image_view(texture.view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(attachment) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(attachment);
            if target.has_stencil {
                rendering_info = rendering_info.stencil_attachment(attachment);
            }
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(command_buffer, &rendering_info);
        }
        frame.set_rendering();
        self.state_dirty = true;

        if let Some(texture) = depth_texture {
            self.retained.push(Box::new(texture));
        }
        Ok(target)
    }

    /// Allocate and fill a descriptor set for the shared set layout
    fn write_descriptor_set(
        &self,
        frame: &FrameState,
        constant_buffers: [vk::Buffer; MAX_CONSTANT_BUFFER_SLOTS as usize],
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Result<vk::DescriptorSet> {
        let device = &self.ctx.device;
        let set_layouts = [self.layouts.set_layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(frame.descriptor_pool)
            .set_layouts(&set_layouts);

        let descriptor_set = unsafe {
            device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to allocate descriptor set: {:?}", e))?[0]
        };

        let buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = constant_buffers
            .iter()
            .map(|&buffer| [vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: vk::WHOLE_SIZE,
            }])
            .collect();
        let image_info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let sampler_info = [vk::DescriptorImageInfo {
            sampler,
            image_view: vk::ImageView::null(),
            image_layout: vk::ImageLayout::UNDEFINED,
        }];

        let mut writes: Vec<vk::WriteDescriptorSet> = buffer_infos
            .iter()
            .enumerate()
            .map(|(slot, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(slot as u32)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(info)
            })
            .collect();
        writes.push(
            vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(TEXTURE_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(&image_info),
        );
        writes.push(
            vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(SAMPLER_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .image_info(&sampler_info),
        );

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
        Ok(descriptor_set)
    }

    /// Record everything a draw needs: rendering scope, pipeline, state, buffers, descriptors
    fn prepare_draw(&mut self, frame: &mut FrameState, indexed: bool) -> Result<vk::CommandBuffer> {
        let pipeline_arc = self.pipeline.clone().ok_or_else(|| {
            engine_error!("tutorial3d::vulkan", "Draw without a bound pipeline");
            Error::InvalidResource("no pipeline bound".to_string())
        })?;
        let vertex_buffer = self.vertex_buffer.clone().ok_or_else(|| {
            engine_error!("tutorial3d::vulkan", "Draw without a bound vertex buffer");
            Error::InvalidResource("no vertex buffer bound".to_string())
        })?;
        let index_buffer = if indexed {
            Some(self.index_buffer.clone().ok_or_else(|| {
                engine_error!("tutorial3d::vulkan", "Indexed draw without a bound index buffer");
                Error::InvalidResource("no index buffer bound".to_string())
            })?)
        } else {
            None
        };

        let command_buffer = self.begin(frame)?;
        let target = self.ensure_rendering(frame, command_buffer)?;

        let pipeline = pipeline_arc
            .as_any()
            .downcast_ref::<Pipeline>()
            .ok_or_else(|| Error::InvalidResource("pipeline from another backend".to_string()))?;
        if pipeline.color_format != target.color_format || pipeline.depth_format != target.depth_format {
            engine_error!(
                "tutorial3d::vulkan",
                "Pipeline formats ({:?}, {:?}) do not match the bound targets ({:?}, {:?})",
                pipeline.color_format,
                pipeline.depth_format,
                target.color_format,
                target.depth_format
            );
            return Err(Error::InvalidResource("pipeline formats do not match render targets".to_string()));
        }

        let rasterizer = self
            .rasterizer_state
            .as_ref()
            .and_then(|state| state.as_any().downcast_ref::<RasterizerState>());
        let wireframe = rasterizer.is_some_and(RasterizerState::wireframe);

        let device = &self.ctx.device;
        unsafe {
            if self.pipeline_dirty {
                device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.variant(wireframe));
                self.retained.push(Box::new(Arc::clone(&pipeline_arc)));
                self.pipeline_dirty = false;
            }

            if self.state_dirty {
                let viewport = self
                    .viewport
                    .unwrap_or_else(|| Viewport::from_size(target.extent.width, target.extent.height));
                // Negative height keeps clip-space +Y pointing up
                device.cmd_set_viewport(
                    command_buffer,
                    0,
                    &[vk::Viewport {
                        x: viewport.x,
                        y: viewport.y + viewport.height,
                        width: viewport.width,
                        height: -viewport.height,
                        min_depth: viewport.min_depth,
                        max_depth: viewport.max_depth,
                    }],
                );
                device.cmd_set_scissor(
                    command_buffer,
                    0,
                    &[vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent: target.extent,
                    }],
                );

                let (cull_mode, front_face) = rasterizer
                    .map_or((DEFAULT_CULL_MODE, DEFAULT_FRONT_FACE), |state| (state.cull_mode, state.front_face));
                device.cmd_set_cull_mode(command_buffer, cull_mode);
                device.cmd_set_front_face(command_buffer, front_face);

                let depth = self
                    .depth_stencil_state
                    .as_ref()
                    .and_then(|state| state.as_any().downcast_ref::<DepthStencilState>());
                let (test_enable, write_enable, compare_op) = match depth {
                    Some(state) => (state.test_enable(), state.write_enable(), state.compare_op),
                    None => {
                        let desc = DepthStencilDesc::default();
                        (desc.depth_enable, desc.depth_write_enable, compare_op_to_vk(desc.depth_func))
                    }
                };
                device.cmd_set_depth_test_enable(command_buffer, test_enable);
                device.cmd_set_depth_write_enable(command_buffer, write_enable);
                device.cmd_set_depth_compare_op(command_buffer, compare_op);
                self.state_dirty = false;
            }

            if self.vertex_buffer_dirty {
                let (buffer, offset) = &vertex_buffer;
                let vk_buffer = vulkan_buffer(buffer)?.buffer;
                device.cmd_bind_vertex_buffers(command_buffer, 0, &[vk_buffer], &[*offset]);
                self.retained.push(Box::new(Arc::clone(buffer)));
                self.vertex_buffer_dirty = false;
            }

            if let Some((buffer, index_type)) = &index_buffer {
                if self.index_buffer_dirty {
                    let vk_buffer = vulkan_buffer(buffer)?.buffer;
                    device.cmd_bind_index_buffer(command_buffer, vk_buffer, 0, index_type_to_vk(*index_type));
                    self.retained.push(Box::new(Arc::clone(buffer)));
                    self.index_buffer_dirty = false;
                }
            }
        }

        if self.descriptors_dirty {
            let mut constant_buffers = [self.defaults.constant_buffer.buffer; MAX_CONSTANT_BUFFER_SLOTS as usize];
            for (slot, bound) in self.constant_buffers.iter().enumerate() {
                if let Some(buffer) = bound {
                    constant_buffers[slot] = vulkan_buffer(buffer)?.buffer;
                    self.retained.push(Box::new(Arc::clone(buffer)));
                }
            }

            let image_view = match &self.texture {
                Some(texture) => {
                    let view = texture
                        .as_any()
                        .downcast_ref::<Texture>()
                        .map(|texture| texture.view)
                        .ok_or_else(|| Error::InvalidResource("texture from another backend".to_string()))?;
                    self.retained.push(Box::new(Arc::clone(texture)));
                    view
                }
                None => self.defaults.texture.view,
            };

            let sampler = match &self.sampler {
                Some(sampler) => {
                    let handle = sampler
                        .as_any()
                        .downcast_ref::<Sampler>()
                        .map(|sampler| sampler.sampler)
                        .ok_or_else(|| Error::InvalidResource("sampler from another backend".to_string()))?;
                    self.retained.push(Box::new(Arc::clone(sampler)));
                    handle
                }
                None => self.defaults.sampler,
            };

            let descriptor_set = self.write_descriptor_set(frame, constant_buffers, image_view, sampler)?;
            unsafe {
                self.ctx.device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.layouts.pipeline_layout,
                    0,
                    &[descriptor_set],
                    &[],
                );
            }
            self.descriptors_dirty = false;
        }

        Ok(command_buffer)
    }
}

impl GraphicsDeviceContext for DeviceContext {
    fn clear_render_target(&mut self, view: &Arc<dyn GraphicsRenderTargetView>, color: [f32; 4]) -> Result<()> {
        let back_buffer = view
            .as_any()
            .downcast_ref::<RenderTargetView>()
            .and_then(RenderTargetView::back_buffer)
            .ok_or_else(|| {
                engine_error!("tutorial3d::vulkan", "clear_render_target: view is not a back buffer view");
                Error::InvalidResource("render target is not a back buffer view".to_string())
            })?;
        self.check_frame(back_buffer.frame())?;

        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        let command_buffer = self.begin(&mut frame)?;
        frame.end_rendering();

        let index = frame.acquire()?;
        frame.transition_swapchain_image(index, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
        let image = match &frame.target {
            Some(target) => target.images[index as usize],
            None => return Err(Error::BackBufferUnavailable("no swapchain".to_string())),
        };

        unsafe {
            self.ctx.device.cmd_clear_color_image(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk::ClearColorValue { float32: color },
                &[color_or_depth_range(vk::ImageAspectFlags::COLOR)],
            );
        }
        Ok(())
    }

    fn clear_depth_stencil(
        &mut self,
        view: &Arc<dyn GraphicsDepthStencilView>,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    ) -> Result<()> {
        let texture_arc = Arc::clone(view.texture());
        let texture = view
            .as_any()
            .downcast_ref::<DepthStencilView>()
            .and_then(DepthStencilView::depth_texture)
            .ok_or_else(|| {
                engine_error!("tutorial3d::vulkan", "clear_depth_stencil: view is not a depth-stencil view");
                Error::InvalidResource("not a depth-stencil view".to_string())
            })?;

        let mut aspect = vk::ImageAspectFlags::empty();
        if flags.contains(ClearFlags::DEPTH) {
            aspect |= vk::ImageAspectFlags::DEPTH;
        }
        if flags.contains(ClearFlags::STENCIL) && texture.aspect.contains(vk::ImageAspectFlags::STENCIL) {
            aspect |= vk::ImageAspectFlags::STENCIL;
        }
        if aspect.is_empty() {
            return Ok(());
        }

        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        let command_buffer = self.begin(&mut frame)?;
        frame.end_rendering();

        transition_texture(&self.ctx.device, command_buffer, texture, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        unsafe {
            self.ctx.device.cmd_clear_depth_stencil_image(
                command_buffer,
                texture.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk::ClearDepthStencilValue {
                    depth,
                    stencil: stencil as u32,
                },
                &[color_or_depth_range(aspect)],
            );
        }
        self.retained.push(Box::new(texture_arc));
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        color: Option<&Arc<dyn GraphicsRenderTargetView>>,
        depth: Option<&Arc<dyn GraphicsDepthStencilView>>,
    ) -> Result<()> {
        if let Some(view) = color {
            if view.as_any().downcast_ref::<RenderTargetView>().is_none() {
                engine_error!("tutorial3d::vulkan", "set_render_targets: color view from another backend");
                return Err(Error::InvalidResource("color view from another backend".to_string()));
            }
        }
        if let Some(view) = depth {
            if view.as_any().downcast_ref::<DepthStencilView>().is_none() {
                engine_error!("tutorial3d::vulkan", "set_render_targets: depth view from another backend");
                return Err(Error::InvalidResource("depth view from another backend".to_string()));
            }
        }

        Self::lock_frame(&self.frame)?.end_rendering();
        self.color_target = color.cloned();
        self.depth_target = depth.cloned();
        // A new scope may have other attachment formats
        self.pipeline_dirty = true;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.state_dirty = true;
    }

    fn set_pipeline(&mut self, pipeline: &Arc<dyn GraphicsPipeline>) -> Result<()> {
        if pipeline.as_any().downcast_ref::<Pipeline>().is_none() {
            engine_error!("tutorial3d::vulkan", "set_pipeline: pipeline from another backend");
            return Err(Error::InvalidResource("pipeline from another backend".to_string()));
        }
        self.pipeline = Some(Arc::clone(pipeline));
        self.pipeline_dirty = true;
        Ok(())
    }

    fn set_depth_stencil_state(&mut self, state: &Arc<dyn GraphicsDepthStencilState>) -> Result<()> {
        if state.as_any().downcast_ref::<DepthStencilState>().is_none() {
            engine_error!("tutorial3d::vulkan", "set_depth_stencil_state: state from another backend");
            return Err(Error::InvalidResource("depth-stencil state from another backend".to_string()));
        }
        self.depth_stencil_state = Some(Arc::clone(state));
        self.state_dirty = true;
        Ok(())
    }

    fn set_rasterizer_state(&mut self, state: &Arc<dyn GraphicsRasterizerState>) -> Result<()> {
        if state.as_any().downcast_ref::<RasterizerState>().is_none() {
            engine_error!("tutorial3d::vulkan", "set_rasterizer_state: state from another backend");
            return Err(Error::InvalidResource("rasterizer state from another backend".to_string()));
        }
        self.rasterizer_state = Some(Arc::clone(state));
        // Fill mode selects the pipeline variant
        self.state_dirty = true;
        self.pipeline_dirty = true;
        Ok(())
    }

    fn set_vertex_buffer(&mut self, buffer: &Arc<dyn GraphicsBuffer>, offset: u64) -> Result<()> {
        check_buffer(buffer, BufferUsage::Vertex)?;
        self.vertex_buffer = Some((Arc::clone(buffer), offset));
        self.vertex_buffer_dirty = true;
        Ok(())
    }

    fn set_index_buffer(&mut self, buffer: &Arc<dyn GraphicsBuffer>, index_type: IndexType) -> Result<()> {
        check_buffer(buffer, BufferUsage::Index)?;
        self.index_buffer = Some((Arc::clone(buffer), index_type));
        self.index_buffer_dirty = true;
        Ok(())
    }

    fn set_constant_buffer(&mut self, slot: u32, buffer: &Arc<dyn GraphicsBuffer>) -> Result<()> {
        check_slot("constant buffer", slot, MAX_CONSTANT_BUFFER_SLOTS)?;
        check_buffer(buffer, BufferUsage::Constant)?;
        self.constant_buffers[slot as usize] = Some(Arc::clone(buffer));
        self.descriptors_dirty = true;
        Ok(())
    }

    fn set_texture(&mut self, slot: u32, texture: &Arc<dyn GraphicsTexture>) -> Result<()> {
        check_slot("texture", slot, MAX_TEXTURE_SLOTS)?;
        let sampled = texture
            .as_any()
            .downcast_ref::<Texture>()
            .is_some_and(|t| t.info.usage == TextureUsage::Sampled);
        if !sampled {
            engine_error!(
                "tutorial3d::vulkan",
                "set_texture: {:?} texture cannot be sampled",
                texture.info().usage
            );
            return Err(Error::InvalidResource("texture is not a sampled texture".to_string()));
        }
        self.texture = Some(Arc::clone(texture));
        self.descriptors_dirty = true;
        Ok(())
    }

    fn set_sampler(&mut self, slot: u32, sampler: &Arc<dyn GraphicsSampler>) -> Result<()> {
        check_slot("sampler", slot, MAX_SAMPLER_SLOTS)?;
        if sampler.as_any().downcast_ref::<Sampler>().is_none() {
            engine_error!("tutorial3d::vulkan", "set_sampler: sampler from another backend");
            return Err(Error::InvalidResource("sampler from another backend".to_string()));
        }
        self.sampler = Some(Arc::clone(sampler));
        self.descriptors_dirty = true;
        Ok(())
    }

    fn update_buffer(&mut self, buffer: &Arc<dyn GraphicsBuffer>, data: &[u8]) -> Result<()> {
        // Starting the recording waits for the GPU to release the previous frame
        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        self.begin(&mut frame)?;
        buffer.update(0, data)
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        let command_buffer = self.prepare_draw(&mut frame, false)?;
        unsafe {
            self.ctx.device.cmd_draw(command_buffer, vertex_count, 1, first_vertex, 0);
        }
        self.draw_calls += 1;
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) -> Result<()> {
        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        let command_buffer = self.prepare_draw(&mut frame, true)?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(command_buffer, index_count, 1, first_index, base_vertex, 0);
        }
        self.draw_calls += 1;
        Ok(())
    }

    fn draw_overlay(&mut self, data: &OverlayDrawData, font_texture: &Arc<dyn GraphicsTexture>) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let font_view = font_texture
            .as_any()
            .downcast_ref::<Texture>()
            .filter(|texture| texture.info.usage == TextureUsage::Sampled)
            .map(|texture| texture.view)
            .ok_or_else(|| {
                engine_error!("tutorial3d::vulkan", "draw_overlay: font texture is not a sampled texture");
                Error::InvalidResource("overlay font texture is not a sampled texture".to_string())
            })?;

        let frame = Arc::clone(&self.frame);
        let mut frame = Self::lock_frame(&frame)?;
        let command_buffer = self.begin(&mut frame)?;
        let target = self.ensure_rendering(&mut frame, command_buffer)?;

        let default_buffer = self.defaults.constant_buffer.buffer;
        let descriptor_set = self.write_descriptor_set(
            &frame,
            [default_buffer; MAX_CONSTANT_BUFFER_SLOTS as usize],
            font_view,
            self.defaults.sampler,
        )?;

        let drawn = self
            .overlay
            .record(command_buffer, descriptor_set, data, &target, &mut self.retained)?;
        self.retained.push(Box::new(Arc::clone(font_texture)));

        // The application's bindings are re-recorded on the next draw
        self.mark_all_dirty();
        engine_debug!("tutorial3d::vulkan", "Overlay recorded ({} draw commands)", drawn);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Self::lock_frame(&self.frame)?.flush()?;
        self.retained.clear();
        self.overlay.reset();
        Ok(())
    }

    fn draw_call_count(&self) -> u32 {
        self.draw_calls
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if let Ok(mut frame) = self.frame.lock() {
            frame.flush().ok();
        }
        self.retained.clear();
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Move a device-owned texture to `new_layout`, recording a barrier when it changes
fn transition_texture(device: &ash::Device, command_buffer: vk::CommandBuffer, texture: &Texture, new_layout: vk::ImageLayout) {
    let old_layout = texture.layout();
    if old_layout != new_layout {
        image_barrier(device, command_buffer, texture.image, texture.aspect, old_layout, new_layout);
        texture.set_layout(new_layout);
    }
}

fn vulkan_buffer(buffer: &Arc<dyn GraphicsBuffer>) -> Result<&Buffer> {
    buffer
        .as_any()
        .downcast_ref::<Buffer>()
        .ok_or_else(|| Error::InvalidResource("buffer from another backend".to_string()))
}

fn check_buffer(buffer: &Arc<dyn GraphicsBuffer>, expected: BufferUsage) -> Result<()> {
    vulkan_buffer(buffer)?;
    if buffer.usage() != expected {
        engine_error!(
            "tutorial3d::vulkan",
            "{:?} buffer bound where a {:?} buffer is expected",
            buffer.usage(),
            expected
        );
        return Err(Error::InvalidResource(format!(
            "{:?} buffer bound as {:?}",
            buffer.usage(),
            expected
        )));
    }
    Ok(())
}

fn check_slot(what: &str, slot: u32, count: u32) -> Result<()> {
    if slot >= count {
        engine_error!("tutorial3d::vulkan", "{} slot {} out of range (0..{})", what, slot, count);
        return Err(Error::InvalidResource(format!("{} slot {} out of range", what, slot)));
    }
    Ok(())
}

/// Convert IndexType to Vulkan index type
pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}
