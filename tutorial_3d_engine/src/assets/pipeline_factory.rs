/// Pipeline factory - builds pipelines from WGSL files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology, ShaderSource, TextureFormat,
    VertexLayoutKind,
};
use crate::{engine_debug, engine_error};

/// Entry point expected in every vertex shader file
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
/// Entry point expected in every fragment shader file
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Render target formats a pipeline is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineFormats {
    pub color: TextureFormat,
    pub depth: Option<TextureFormat>,
}

pub struct PipelineFactory {
    root: PathBuf,
}

impl PipelineFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read both shader files and create a triangle-list pipeline
    pub fn create_pipeline(
        &self,
        device: &mut dyn GraphicsDevice,
        vertex_shader_path: impl AsRef<Path>,
        fragment_shader_path: impl AsRef<Path>,
        vertex_layout: VertexLayoutKind,
        formats: PipelineFormats,
    ) -> Result<Arc<dyn Pipeline>> {
        let vertex_code = self.read_shader(vertex_shader_path.as_ref())?;
        let fragment_code = self.read_shader(fragment_shader_path.as_ref())?;

        let pipeline = device.create_pipeline(PipelineDesc {
            vertex_shader: ShaderSource::new(vertex_code, VERTEX_ENTRY_POINT),
            fragment_shader: ShaderSource::new(fragment_code, FRAGMENT_ENTRY_POINT),
            vertex_layout,
            topology: PrimitiveTopology::TriangleList,
            color_format: formats.color,
            depth_format: formats.depth,
        })?;

        engine_debug!(
            "tutorial3d::PipelineFactory",
            "Pipeline created from {} + {}",
            vertex_shader_path.as_ref().display(),
            fragment_shader_path.as_ref().display()
        );
        Ok(pipeline)
    }

    /// Read a shader file as UTF-8 text
    pub fn read_shader(&self, path: &Path) -> Result<String> {
        let full_path = self.root.join(path);
        std::fs::read_to_string(&full_path).map_err(|e| {
            engine_error!(
                "tutorial3d::PipelineFactory",
                "Failed to read shader '{}': {}",
                full_path.display(),
                e
            );
            Error::AssetLoadFailed(format!("{}: {}", full_path.display(), e))
        })
    }
}

#[cfg(test)]
#[path = "pipeline_factory_tests.rs"]
mod tests;
