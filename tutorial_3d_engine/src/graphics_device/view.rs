/// Render-target and depth-stencil views
///
/// A view keeps its texture alive. Views derived from a swapchain back buffer
/// must all be dropped before the swapchain buffers can be resized.

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::Texture;

/// Color attachment view
pub trait RenderTargetView: Send + Sync {
    /// Texture the view was created from
    fn texture(&self) -> &Arc<dyn Texture>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Depth-stencil attachment view
pub trait DepthStencilView: Send + Sync {
    /// Texture the view was created from
    fn texture(&self) -> &Arc<dyn Texture>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
