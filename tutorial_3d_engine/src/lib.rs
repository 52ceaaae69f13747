/*!
# Tutorial 3D Engine

Core traits and types for the Tutorial3D rendering samples.

This crate holds the platform-agnostic API: a D3D11-style graphics device
(device, immediate context, swapchain) expressed as traits, plus the
per-sample building blocks layered on it. Backend implementations (Vulkan)
are registered at runtime through the plugin system.

## Architecture

- **GraphicsDevice**: Factory trait for buffers, textures, pipelines, states and views
- **DeviceContext**: Immediate context recording state changes and draws
- **Swapchain**: Presentable back buffers
- **SwapchainManager**: Swapchain views and the resize lifecycle
- **RenderStateCatalog**: Pre-created depth-stencil and rasterizer states
- **FrameRenderer**: Per-frame clear / bind / draw / overlay / present order
- **DebugOverlay**: Render-state controls drawn with imgui
- **ApplicationHost**: winit event loop driving an `Application`
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod swapchain_manager;
pub mod render_state;
pub mod frame;
pub mod overlay;
pub mod camera;
pub mod assets;
pub mod app;

// Main tutorial3d namespace module
pub mod tutorial3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (global logger)
    pub use crate::engine::Engine;

    // Graphics device factory trait
    pub use crate::graphics_device::GraphicsDevice;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all device-level types
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::swapchain_manager::{SwapchainManager, ResizeListener, ResizeOutcome};
        pub use crate::render_state::*;
        pub use crate::frame::*;
    }

    // Debug overlay sub-module
    pub mod overlay {
        pub use crate::overlay::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Asset factories sub-module
    pub mod assets {
        pub use crate::assets::*;
    }

    // Application base sub-module
    pub mod app {
        pub use crate::app::*;
    }
}

// Re-export math library at crate root
pub use glam;
