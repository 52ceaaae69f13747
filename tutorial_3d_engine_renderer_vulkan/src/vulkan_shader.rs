/// Shader compilation - WGSL to SPIR-V through naga
///
/// Shader modules only live for the duration of pipeline creation.

use tutorial_3d_engine::tutorial3d::{Result, Error};
use tutorial_3d_engine::tutorial3d::render::ShaderSource;
use tutorial_3d_engine::{engine_error, engine_err};
use ash::vk;

/// Shader stage of a compiled module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub(crate) fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

/// Parse, validate and translate WGSL into SPIR-V words for one entry point
///
/// Clip-space Y is flipped on output so vertex shaders use a Y-up clip space.
pub(crate) fn compile_wgsl(source: &ShaderSource, stage: ShaderStage) -> Result<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(&source.code).map_err(|e| {
        let message = e.emit_to_string(&source.code);
        engine_error!("tutorial3d::vulkan", "WGSL parse error:\n{}", message);
        Error::InvalidResource(format!("WGSL parse error: {}", e))
    })?;

    let has_entry_point = module
        .entry_points
        .iter()
        .any(|ep| ep.name == source.entry_point && ep.stage == stage.to_naga());
    if !has_entry_point {
        engine_error!(
            "tutorial3d::vulkan",
            "Shader has no {:?} entry point named '{}'",
            stage,
            source.entry_point
        );
        return Err(Error::InvalidResource(format!(
            "missing {:?} entry point '{}'",
            stage, source.entry_point
        )));
    }

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::PUSH_CONSTANT,
    )
    .validate(&module)
    .map_err(|e| {
        let message = e.emit_to_string(&source.code);
        engine_error!("tutorial3d::vulkan", "WGSL validation error:\n{}", message);
        Error::InvalidResource(format!("WGSL validation error: {}", e))
    })?;

    let mut options = naga::back::spv::Options::default();
    options.flags = naga::back::spv::WriterFlags::ADJUST_COORDINATE_SPACE
        | naga::back::spv::WriterFlags::LABEL_VARYINGS;

    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage.to_naga(),
        entry_point: source.entry_point.clone(),
    };

    naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options)).map_err(|e| {
        engine_error!("tutorial3d::vulkan", "SPIR-V generation failed: {}", e);
        Error::InvalidResource(format!("SPIR-V generation failed: {}", e))
    })
}

/// Compile WGSL and wrap it in a VkShaderModule
pub(crate) fn create_shader_module(
    device: &ash::Device,
    source: &ShaderSource,
    stage: ShaderStage,
) -> Result<vk::ShaderModule> {
    let words = compile_wgsl(source, stage)?;
    let create_info = vk::ShaderModuleCreateInfo::default().code(&words);

    unsafe {
        device
            .create_shader_module(&create_info, None)
            .map_err(|e| engine_err!("tutorial3d::vulkan", "Failed to create {:?} shader module: {:?}", stage, e))
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
