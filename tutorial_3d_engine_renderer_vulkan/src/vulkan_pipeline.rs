/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// Every pipeline shares one descriptor set layout following the binding
/// convention (constant buffers 0..=2, texture 3, sampler 4). Cull mode,
/// front face and the depth test are dynamic state; fill mode is not, so
/// each pipeline is built twice (fill and wireframe).

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::{
    Pipeline as GraphicsPipeline, PipelineDesc, PrimitiveTopology, VertexFormat, VertexLayoutKind,
    MAX_CONSTANT_BUFFER_SLOTS,
};
use tutorial_3d_engine::{engine_error, engine_err, engine_debug};
use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveKind};
use crate::vulkan_shader::{create_shader_module, ShaderStage};
use crate::vulkan_texture::texture_format_to_vk;

/// Binding of the sampled texture in the shared set layout
pub(crate) const TEXTURE_BINDING: u32 = MAX_CONSTANT_BUFFER_SLOTS;

/// Binding of the sampler in the shared set layout
pub(crate) const SAMPLER_BINDING: u32 = MAX_CONSTANT_BUFFER_SLOTS + 1;

/// Size of the overlay push constants (scale + translate)
pub(crate) const OVERLAY_PUSH_CONSTANT_SIZE: u32 = 16;

/// Descriptor set layout and pipeline layouts shared by every pipeline
#[derive(Clone, Copy)]
pub(crate) struct PipelineLayouts {
    pub(crate) set_layout: vk::DescriptorSetLayout,
    /// Layout of scene pipelines
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Layout of the overlay pipeline (adds push constants)
    pub(crate) overlay_layout: vk::PipelineLayout,
}

impl PipelineLayouts {
    pub(crate) fn create(device: &ash::Device) -> Result<Self> {
        let stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        let mut bindings: Vec<vk::DescriptorSetLayoutBinding> = (0..MAX_CONSTANT_BUFFER_SLOTS)
            .map(|slot| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(slot)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(1)
                    .stage_flags(stages)
            })
            .collect();
        bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(TEXTURE_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(1)
                .stage_flags(stages),
        );
        bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(SAMPLER_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .descriptor_count(1)
                .stage_flags(stages),
        );

        unsafe {
            let set_layout = device
                .create_descriptor_set_layout(&vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings), None)
                .map_err(|e| layout_error("descriptor set layout", e))?;

            let set_layouts = [set_layout];
            let pipeline_layout = device
                .create_pipeline_layout(&vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts), None)
                .map_err(|e| layout_error("pipeline layout", e))?;

            let push_constant_ranges = [vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: OVERLAY_PUSH_CONSTANT_SIZE,
            }];
            let overlay_layout = device
                .create_pipeline_layout(
                    &vk::PipelineLayoutCreateInfo::default()
                        .set_layouts(&set_layouts)
                        .push_constant_ranges(&push_constant_ranges),
                    None,
                )
                .map_err(|e| layout_error("overlay pipeline layout", e))?;

            Ok(Self {
                set_layout,
                pipeline_layout,
                overlay_layout,
            })
        }
    }

    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_pipeline_layout(self.overlay_layout, None);
        device.destroy_pipeline_layout(self.pipeline_layout, None);
        device.destroy_descriptor_set_layout(self.set_layout, None);
    }
}

fn layout_error(what: &str, e: vk::Result) -> Error {
    engine_error!("tutorial3d::vulkan", "Failed to create {}: {:?}", what, e);
    Error::InitializationFailed(format!("Failed to create {}: {:?}", what, e))
}

/// Fixed-function inputs for [`build_graphics_pipeline`]
pub(crate) struct GraphicsPipelineSpec<'a> {
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) vertex_module: vk::ShaderModule,
    pub(crate) vertex_entry: &'a str,
    pub(crate) fragment_module: vk::ShaderModule,
    pub(crate) fragment_entry: &'a str,
    pub(crate) vertex_stride: u32,
    pub(crate) vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub(crate) topology: vk::PrimitiveTopology,
    pub(crate) polygon_mode: vk::PolygonMode,
    /// Straight alpha blending (overlay)
    pub(crate) alpha_blend: bool,
    pub(crate) color_format: vk::Format,
    pub(crate) depth_format: vk::Format,
    pub(crate) has_stencil: bool,
}

/// Create one graphics pipeline for dynamic rendering
pub(crate) fn build_graphics_pipeline(device: &ash::Device, spec: &GraphicsPipelineSpec<'_>) -> Result<vk::Pipeline> {
    let entry_point_vert = CString::new(spec.vertex_entry)
        .map_err(|_| Error::InvalidResource(format!("invalid entry point name '{}'", spec.vertex_entry)))?;
    let entry_point_frag = CString::new(spec.fragment_entry)
        .map_err(|_| Error::InvalidResource(format!("invalid entry point name '{}'", spec.fragment_entry)))?;

    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(ShaderStage::Vertex.to_vk())
            .module(spec.vertex_module)
            .name(&entry_point_vert),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(ShaderStage::Fragment.to_vk())
            .module(spec.fragment_module)
            .name(&entry_point_frag),
    ];

    let vertex_bindings = [vk::VertexInputBindingDescription {
        binding: 0,
        stride: spec.vertex_stride,
        input_rate: vk::VertexInputRate::VERTEX,
    }];
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&spec.vertex_attributes);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(spec.topology)
        .primitive_restart_enable(false);

    // Viewport state (dynamic)
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    // Cull mode and front face are overwritten by dynamic state
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(spec.polygon_mode)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(false)
        .depth_write_enable(false)
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let color_blend_attachment = if spec.alpha_blend {
        vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD)
    } else {
        vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
    };
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(std::slice::from_ref(&color_blend_attachment));

    let dynamic_states = [
        vk::DynamicState::VIEWPORT,
        vk::DynamicState::SCISSOR,
        vk::DynamicState::CULL_MODE,
        vk::DynamicState::FRONT_FACE,
        vk::DynamicState::DEPTH_TEST_ENABLE,
        vk::DynamicState::DEPTH_WRITE_ENABLE,
        vk::DynamicState::DEPTH_COMPARE_OP,
    ];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let color_formats = [spec.color_format];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
        .color_attachment_formats(&color_formats)
        .depth_attachment_format(spec.depth_format);
    if spec.has_stencil {
        rendering_info = rendering_info.stencil_attachment_format(spec.depth_format);
    }

    let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
        .push_next(&mut rendering_info)
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .depth_stencil_state(&depth_stencil_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(spec.layout);

    unsafe {
        let pipelines = device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
            .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create graphics pipeline: {:?}", e.1))?;
        Ok(pipelines[0])
    }
}

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Solid fill variant
    pub(crate) fill: vk::Pipeline,
    /// Wireframe variant
    pub(crate) wireframe: vk::Pipeline,
    vertex_layout: VertexLayoutKind,
    pub(crate) color_format: vk::Format,
    pub(crate) depth_format: vk::Format,
}

impl Pipeline {
    pub(crate) fn create(ctx: Arc<GpuContext>, layouts: &PipelineLayouts, desc: &PipelineDesc) -> Result<Self> {
        let device = &ctx.device;
        let vertex_module = create_shader_module(device, &desc.vertex_shader, ShaderStage::Vertex)?;
        let fragment_module = match create_shader_module(device, &desc.fragment_shader, ShaderStage::Fragment) {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let color_format = texture_format_to_vk(desc.color_format, ctx.depth_stencil_format);
        let depth_format = desc
            .depth_format
            .map(|format| texture_format_to_vk(format, ctx.depth_stencil_format))
            .unwrap_or(vk::Format::UNDEFINED);

        let mut spec = GraphicsPipelineSpec {
            layout: layouts.pipeline_layout,
            vertex_module,
            vertex_entry: &desc.vertex_shader.entry_point,
            fragment_module,
            fragment_entry: &desc.fragment_shader.entry_point,
            vertex_stride: desc.vertex_layout.stride(),
            vertex_attributes: vertex_attributes_to_vk(desc.vertex_layout),
            topology: topology_to_vk(desc.topology),
            polygon_mode: vk::PolygonMode::FILL,
            alpha_blend: false,
            color_format,
            depth_format,
            has_stencil: desc.depth_format.is_some_and(|format| format.has_stencil()),
        };

        let fill = build_graphics_pipeline(device, &spec);
        spec.polygon_mode = vk::PolygonMode::LINE;
        let wireframe = build_graphics_pipeline(device, &spec);

        unsafe {
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);
        }

        let (fill, wireframe) = match (fill, wireframe) {
            (Ok(fill), Ok(wireframe)) => (fill, wireframe),
            (fill, wireframe) => {
                unsafe {
                    if let Ok(pipeline) = &fill {
                        device.destroy_pipeline(*pipeline, None);
                    }
                    if let Ok(pipeline) = &wireframe {
                        device.destroy_pipeline(*pipeline, None);
                    }
                }
                return Err(fill.and(wireframe).err().unwrap_or_else(|| {
                    Error::BackendError("pipeline creation failed".to_string())
                }));
            }
        };

        engine_debug!(
            "tutorial3d::vulkan",
            "Created pipeline ({:?}, {:?}, color {:?}, depth {:?})",
            desc.vertex_layout,
            desc.topology,
            desc.color_format,
            desc.depth_format
        );

        ctx.live.acquire(LiveKind::Pipeline);
        Ok(Self {
            ctx,
            fill,
            wireframe,
            vertex_layout: desc.vertex_layout,
            color_format,
            depth_format,
        })
    }

    /// Variant matching the bound fill mode
    pub(crate) fn variant(&self, wireframe: bool) -> vk::Pipeline {
        if wireframe {
            self.wireframe
        } else {
            self.fill
        }
    }
}

impl GraphicsPipeline for Pipeline {
    fn vertex_layout(&self) -> VertexLayoutKind {
        self.vertex_layout
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.fill, None);
            self.ctx.device.destroy_pipeline(self.wireframe, None);
        }
        self.ctx.live.release(LiveKind::Pipeline);
    }
}

/// Convert PrimitiveTopology to Vulkan topology
pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

/// Convert VertexFormat to Vulkan format
pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Float32x2 => vk::Format::R32G32_SFLOAT,
        VertexFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
        VertexFormat::Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
    }
}

/// Attribute descriptions of a vertex layout, all on binding 0
pub(crate) fn vertex_attributes_to_vk(layout: VertexLayoutKind) -> Vec<vk::VertexInputAttributeDescription> {
    layout
        .attributes()
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: 0,
            format: vertex_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect()
}
