/// Swapchain trait - for window presentation

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Texture, TextureFormat};

/// Descriptor for creating a swapchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Back buffer format
    pub format: TextureFormat,
    /// Number of buffers
    pub buffer_count: u32,
    /// Wait for vertical blank on present
    pub vsync: bool,
}

impl SwapchainDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

impl Default for SwapchainDesc {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            format: TextureFormat::B8G8R8A8_UNORM,
            buffer_count: 2,
            vsync: true,
        }
    }
}

/// Swapchain for presenting rendered images to a window
///
/// The back buffer handle follows the buffer being rendered this frame,
/// so it is retrieved once after creation and after every resize.
pub trait Swapchain: Send {
    /// Retrieve the back buffer as a render-target texture
    fn back_buffer(&mut self) -> Result<Arc<dyn Texture>>;

    /// Resize every buffer, keeping format and buffer count
    ///
    /// Fails while any back buffer handle (or a view created from one) is alive.
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()>;

    /// Present the current back buffer
    ///
    /// `sync_interval` 0 presents immediately, 1 waits for the next vertical blank.
    fn present(&mut self, sync_interval: u32) -> Result<()>;

    /// Width of the buffers in pixels
    fn width(&self) -> u32;

    /// Height of the buffers in pixels
    fn height(&self) -> u32;

    /// Pixel format of the buffers
    fn format(&self) -> TextureFormat;

    /// Number of buffers
    fn buffer_count(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
