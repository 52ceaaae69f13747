/// Pieces shared by the samples

use std::path::PathBuf;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tutorial_3d_engine::tutorial3d::app::{AppContext, DeviceResources};
use tutorial_3d_engine::tutorial3d::assets::{MeshData, Model, ModelFactory, TextureFactory};
use tutorial_3d_engine::tutorial3d::render::{
    Buffer, BufferDesc, Config, ResizeListener, ResizeOutcome, Texture, TextureFormat,
};
use tutorial_3d_engine::tutorial3d::{Error, GraphicsDevice, Result};
use tutorial_3d_engine::{engine_error, engine_info};

use crate::args::SampleArgs;

/// Directory holding shaders and sample assets
pub const ASSET_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

/// Degrees the object turns per frame
pub const ROTATION_STEP_DEGREES: f32 = 90.0 * (10.0 / 60000.0);

/// Half edge of the fallback cube
pub const CUBE_HALF_EXTENT: f32 = 1.0;

/// Per-object constants at `OBJECT_CONSTANTS_SLOT`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: Mat4,
}

impl ObjectConstants {
    /// World matrix turning the object `degrees` around Y
    pub fn rotation_y(degrees: f32) -> Self {
        Self {
            world: Mat4::from_rotation_y(degrees.to_radians()),
        }
    }
}

pub fn asset_root() -> PathBuf {
    PathBuf::from(ASSET_ROOT)
}

/// Next rotation angle, wrapped to [0, 360)
pub fn advance_rotation(angle: f32, forward: bool) -> f32 {
    let step = if forward { ROTATION_STEP_DEGREES } else { -ROTATION_STEP_DEGREES };
    (angle + step).rem_euclid(360.0)
}

/// Device, context and swapchain for the sample's window
pub fn create_device_resources(
    context: &AppContext<'_>,
    args: &SampleArgs,
    depth_format: Option<TextureFormat>,
) -> Result<DeviceResources> {
    let config = Config {
        enable_validation: args.validation(),
        app_name: context.config.title.clone(),
        ..Config::default()
    };
    DeviceResources::create(context.window.as_ref(), &context.config.renderer, config, depth_format)
}

/// Model from `--model`, or a cube when none was given
pub fn load_model(device: &mut dyn GraphicsDevice, args: &SampleArgs) -> Result<Model> {
    match &args.model {
        Some(path) => ModelFactory::new(asset_root()).load_model(device, path),
        None => ModelFactory::upload(device, &MeshData::cube(CUBE_HALF_EXTENT)),
    }
}

/// Texture from `--texture` (checkerboard when it cannot be read)
pub fn load_texture(device: &mut dyn GraphicsDevice, args: &SampleArgs) -> Result<Arc<dyn Texture>> {
    let factory = TextureFactory::new(asset_root());
    match &args.texture {
        Some(path) => factory.load_or_checkerboard(device, path),
        None => device.create_texture(TextureFactory::checkerboard(256, 32)),
    }
}

pub fn create_constant_buffer<T: Pod>(device: &mut dyn GraphicsDevice) -> Result<Arc<dyn Buffer>> {
    device.create_buffer(BufferDesc::constant::<T>())
}

/// Resize through `resources`, logging instead of failing
pub fn resize(
    resources: &mut Option<DeviceResources>,
    width: u32,
    height: u32,
    listeners: &mut [&mut dyn ResizeListener],
) {
    let Some(resources) = resources.as_mut() else {
        return;
    };
    match resources.resize(width, height, listeners) {
        Ok(ResizeOutcome::Resized { width, height }) => {
            engine_info!("tutorial3d::samples", "Resized to {}x{}", width, height);
        }
        Ok(_) => {}
        Err(e) => engine_error!("tutorial3d::samples", "Resize to {}x{} failed: {}", width, height, e),
    }
}

/// Error for calls made before `initialize`/`load`
pub fn not_loaded(stage: &str) -> Error {
    Error::InvalidFrameState(format!("{} called before the sample was loaded", stage))
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod tests;
