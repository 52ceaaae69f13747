/// Graphics device module - backend-facing traits and descriptors

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod sampler;
pub mod pipeline;
pub mod render_state;
pub mod view;
pub mod swapchain;
pub mod device_context;
pub mod overlay_draw;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use sampler::*;
pub use pipeline::*;
pub use render_state::*;
pub use view::*;
pub use swapchain::*;
pub use device_context::*;
pub use overlay_draw::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
