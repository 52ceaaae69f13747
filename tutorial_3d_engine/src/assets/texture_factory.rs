/// Texture factory - decodes images with `image` and uploads them as RGBA8

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage};
use crate::{engine_debug, engine_error, engine_warn};

pub struct TextureFactory {
    root: PathBuf,
}

impl TextureFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Decode and upload an image file
    pub fn load_texture(&self, device: &mut dyn GraphicsDevice, path: impl AsRef<Path>) -> Result<Arc<dyn Texture>> {
        let full_path = self.root.join(path.as_ref());
        let bytes = std::fs::read(&full_path).map_err(|e| {
            engine_error!("tutorial3d::TextureFactory", "Failed to read '{}': {}", full_path.display(), e);
            Error::AssetLoadFailed(format!("{}: {}", full_path.display(), e))
        })?;

        let desc = Self::decode(&bytes).map_err(|e| {
            engine_error!("tutorial3d::TextureFactory", "Failed to decode '{}': {}", full_path.display(), e);
            e
        })?;

        engine_debug!(
            "tutorial3d::TextureFactory",
            "Loaded '{}' ({}x{})",
            full_path.display(),
            desc.width,
            desc.height
        );
        device.create_texture(desc)
    }

    /// Load `path`, or upload a checkerboard when it cannot be loaded
    pub fn load_or_checkerboard(
        &self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> Result<Arc<dyn Texture>> {
        match self.load_texture(device, path.as_ref()) {
            Ok(texture) => Ok(texture),
            Err(Error::AssetLoadFailed(reason)) => {
                engine_warn!(
                    "tutorial3d::TextureFactory",
                    "Using checkerboard for '{}': {}",
                    path.as_ref().display(),
                    reason
                );
                device.create_texture(Self::checkerboard(256, 32))
            }
            Err(e) => Err(e),
        }
    }

    /// Decode encoded image bytes into an sRGB RGBA8 texture description
    pub fn decode(bytes: &[u8]) -> Result<TextureDesc> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::AssetLoadFailed(format!("image decode: {}", e)))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::AssetLoadFailed("image has zero size".to_string()));
        }

        Ok(TextureDesc {
            width,
            height,
            format: TextureFormat::R8G8B8A8_SRGB,
            usage: TextureUsage::Sampled,
            data: Some(image.into_raw()),
        })
    }

    /// Grey/white checkerboard of `size` x `size` pixels with `cell`-pixel squares
    pub fn checkerboard(size: u32, cell: u32) -> TextureDesc {
        let size = size.max(1);
        let cell = cell.max(1);
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let value = if ((x / cell) + (y / cell)) % 2 == 0 { 255 } else { 96 };
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }

        TextureDesc {
            width: size,
            height: size,
            format: TextureFormat::R8G8B8A8_SRGB,
            usage: TextureUsage::Sampled,
            data: Some(data),
        }
    }
}

#[cfg(test)]
#[path = "texture_factory_tests.rs"]
mod tests;
