/// Overlay renderer - draws OverlayDrawData on top of the bound color target
///
/// Vertices and indices are streamed into host-visible buffers that grow on
/// demand. One pipeline exists per (color, depth) format pair since dynamic
/// rendering bakes the attachment formats into the pipeline.

use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::tutorial3d::render::{
    Buffer as GraphicsBuffer, BufferUsage, OverlayDrawData, OverlayVertex, ShaderSource,
};
use tutorial_3d_engine::{engine_debug, engine_trace};
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_device_context::{Retained, RenderingTarget};
use crate::vulkan_pipeline::{build_graphics_pipeline, GraphicsPipelineSpec};
use crate::vulkan_shader::{create_shader_module, ShaderStage};

const OVERLAY_SHADER: &str = r#"
struct ClipTransform {
    scale: vec2<f32>,
    translate: vec2<f32>,
};

var<push_constant> clip: ClipTransform;

@group(0) @binding(3) var font_texture: texture_2d<f32>;
@group(0) @binding(4) var font_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let ndc = position * clip.scale + clip.translate;
    // Overlay pixels grow downwards
    out.position = vec4<f32>(ndc.x, -ndc.y, 0.0, 1.0);
    out.uv = uv;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color * textureSample(font_texture, font_sampler, in.uv);
}
"#;

/// Initial stream sizes in bytes
const INITIAL_VERTEX_BYTES: u64 = 64 * 1024;
const INITIAL_INDEX_BYTES: u64 = 32 * 1024;

/// Offsets inside a stream stay aligned for any index type
const STREAM_ALIGNMENT: u64 = 16;

/// Host-visible buffer written front to back during one recording
struct OverlayStream {
    usage: BufferUsage,
    buffer: Option<Arc<Buffer>>,
    cursor: u64,
}

impl OverlayStream {
    fn new(usage: BufferUsage) -> Self {
        Self {
            usage,
            buffer: None,
            cursor: 0,
        }
    }

    /// Append `bytes` and return the buffer holding them with their offset
    ///
    /// A full buffer is replaced by one twice as large; the old one is
    /// retained until the recording completes.
    fn write(
        &mut self,
        ctx: &Arc<GpuContext>,
        bytes: &[u8],
        initial_size: u64,
        retained: &mut Vec<Retained>,
    ) -> Result<(Arc<Buffer>, u64)> {
        let needed = bytes.len() as u64;
        let offset = self.cursor.next_multiple_of(STREAM_ALIGNMENT);

        let buffer = match &self.buffer {
            Some(buffer) if offset + needed <= buffer.size => Arc::clone(buffer),
            current => {
                let mut size = current.as_ref().map_or(initial_size, |buffer| buffer.size * 2);
                while size < needed {
                    size *= 2;
                }
                let name = match self.usage {
                    BufferUsage::Index => "overlay indices",
                    _ => "overlay vertices",
                };
                engine_debug!("tutorial3d::vulkan", "Growing {} buffer to {} bytes", name, size);

                let buffer = Arc::new(Buffer::create(Arc::clone(ctx), size, self.usage, name)?);
                if let Some(old) = self.buffer.replace(Arc::clone(&buffer)) {
                    retained.push(Box::new(old));
                }
                self.cursor = 0;
                buffer
            }
        };

        let offset = self.cursor.next_multiple_of(STREAM_ALIGNMENT);
        buffer.update(offset, bytes)?;
        self.cursor = offset + needed;
        Ok((buffer, offset))
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Overlay drawing state owned by the immediate context
pub(crate) struct OverlayRenderer {
    ctx: Arc<GpuContext>,
    layout: vk::PipelineLayout,
    pipelines: FxHashMap<(vk::Format, vk::Format), vk::Pipeline>,
    vertices: OverlayStream,
    indices: OverlayStream,
}

impl OverlayRenderer {
    pub(crate) fn new(ctx: Arc<GpuContext>, layout: vk::PipelineLayout) -> Self {
        Self {
            ctx,
            layout,
            pipelines: FxHashMap::default(),
            vertices: OverlayStream::new(BufferUsage::Vertex),
            indices: OverlayStream::new(BufferUsage::Index),
        }
    }

    /// Start writing the streams from the beginning (the GPU is done with them)
    pub(crate) fn reset(&mut self) {
        self.vertices.reset();
        self.indices.reset();
    }

    fn pipeline(&mut self, target: &RenderingTarget) -> Result<vk::Pipeline> {
        let key = (target.color_format, target.depth_format);
        if let Some(&pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline);
        }

        let device = &self.ctx.device;
        let vertex_module = create_shader_module(
            device,
            &ShaderSource::new(OVERLAY_SHADER, "vs_main"),
            ShaderStage::Vertex,
        )?;
        let fragment_module = match create_shader_module(
            device,
            &ShaderSource::new(OVERLAY_SHADER, "fs_main"),
            ShaderStage::Fragment,
        ) {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let spec = GraphicsPipelineSpec {
            layout: self.layout,
            vertex_module,
            vertex_entry: "vs_main",
            fragment_module,
            fragment_entry: "fs_main",
            vertex_stride: std::mem::size_of::<OverlayVertex>() as u32,
            vertex_attributes: overlay_vertex_attributes(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            alpha_blend: true,
            color_format: target.color_format,
            depth_format: target.depth_format,
            has_stencil: target.has_stencil,
        };
        let pipeline = build_graphics_pipeline(device, &spec);

        unsafe {
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);
        }

        let pipeline = pipeline?;
        engine_debug!(
            "tutorial3d::vulkan",
            "Created overlay pipeline for {:?} / {:?}",
            target.color_format,
            target.depth_format
        );
        self.pipelines.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Record the overlay draws; returns the number of commands drawn
    ///
    /// Leaves pipeline, descriptor set, buffers and dynamic state changed.
    pub(crate) fn record(
        &mut self,
        command_buffer: vk::CommandBuffer,
        descriptor_set: vk::DescriptorSet,
        data: &OverlayDrawData,
        target: &RenderingTarget,
        retained: &mut Vec<Retained>,
    ) -> Result<u32> {
        let pipeline = self.pipeline(target)?;

        let ctx = Arc::clone(&self.ctx);
        let (vertex_buffer, vertex_offset) = self.vertices.write(
            &ctx,
            bytemuck::cast_slice(&data.vertices),
            INITIAL_VERTEX_BYTES,
            retained,
        )?;
        let (index_buffer, index_offset) = self.indices.write(
            &ctx,
            bytemuck::cast_slice(&data.indices),
            INITIAL_INDEX_BYTES,
            retained,
        )?;

        let (scale, translate) = data.clip_transform();
        let clip_transform = [scale[0], scale[1], translate[0], translate[1]];
        let extent = target.extent;
        let mut drawn = 0;

        let device = &ctx.device;
        unsafe {
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &[descriptor_set],
                &[],
            );
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer.buffer], &[vertex_offset]);
            device.cmd_bind_index_buffer(command_buffer, index_buffer.buffer, index_offset, vk::IndexType::UINT16);
            device.cmd_push_constants(
                command_buffer,
                self.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::cast_slice(&clip_transform),
            );

            device.cmd_set_viewport(
                command_buffer,
                0,
                &[vk::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: extent.width as f32,
                    height: extent.height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            );
            device.cmd_set_cull_mode(command_buffer, vk::CullModeFlags::NONE);
            device.cmd_set_front_face(command_buffer, vk::FrontFace::COUNTER_CLOCKWISE);
            device.cmd_set_depth_test_enable(command_buffer, false);
            device.cmd_set_depth_write_enable(command_buffer, false);
            device.cmd_set_depth_compare_op(command_buffer, vk::CompareOp::ALWAYS);

            for command in &data.commands {
                let Some([x, y, width, height]) = data.scissor_for(command, extent.width, extent.height) else {
                    continue;
                };
                device.cmd_set_scissor(
                    command_buffer,
                    0,
                    &[vk::Rect2D {
                        offset: vk::Offset2D { x: x as i32, y: y as i32 },
                        extent: vk::Extent2D { width, height },
                    }],
                );
                device.cmd_draw_indexed(
                    command_buffer,
                    command.index_count,
                    1,
                    command.first_index,
                    command.vertex_offset,
                    0,
                );
                drawn += 1;
            }
        }

        engine_trace!(
            "tutorial3d::vulkan",
            "Overlay: {} vertices, {} indices, {}/{} commands drawn",
            data.vertices.len(),
            data.indices.len(),
            drawn,
            data.commands.len()
        );
        Ok(drawn)
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        unsafe {
            for (_, pipeline) in self.pipelines.drain() {
                self.ctx.device.destroy_pipeline(pipeline, None);
            }
        }
    }
}

/// Attributes of [`OverlayVertex`]: position, uv, packed color
pub(crate) fn overlay_vertex_attributes() -> Vec<vk::VertexInputAttributeDescription> {
    vec![
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: 8,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 0,
            format: vk::Format::R8G8B8A8_UNORM,
            offset: 16,
        },
    ]
}
