/// Application trait and the contexts handed to it by the host

use std::sync::Arc;

use winit::event::WindowEvent;
use winit::window::Window;

use crate::error::Result;
use super::input::InputState;

/// Window and renderer settings read by the host
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Name of the registered graphics device plugin
    pub renderer: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Tutorial3D".to_string(),
            width: 1280,
            height: 720,
            renderer: "vulkan".to_string(),
        }
    }
}

/// Passed to [`Application::initialize`]
pub struct AppContext<'a> {
    pub window: &'a Arc<Window>,
    pub config: &'a AppConfig,
}

/// Passed to [`Application::update`] once per frame
pub struct UpdateContext<'a> {
    pub input: &'a InputState,
    /// Seconds since the previous update
    pub delta_time: f32,
    pub frame_index: u64,
    exit_requested: bool,
}

impl<'a> UpdateContext<'a> {
    pub fn new(input: &'a InputState, delta_time: f32, frame_index: u64) -> Self {
        Self {
            input,
            delta_time,
            frame_index,
            exit_requested: false,
        }
    }

    /// Close the window after this frame
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// A sample driven by [`ApplicationHost`](super::ApplicationHost)
///
/// Call order: `initialize`, `load`, then per frame `update` + `render`.
/// `on_resize` runs whenever the window's client size changes and
/// `shutdown` once before the host exits.
pub trait Application {
    /// Create the graphics device, context and swapchain
    fn initialize(&mut self, context: &mut AppContext<'_>) -> Result<()>;

    /// Create pipelines, buffers, textures and states
    fn load(&mut self) -> Result<()>;

    fn update(&mut self, context: &mut UpdateContext<'_>);

    fn render(&mut self) -> Result<()>;

    fn on_resize(&mut self, width: u32, height: u32);

    /// Raw window events, after the host updated its input state
    #[allow(unused_variables)]
    fn on_window_event(&mut self, event: &WindowEvent) {}

    fn shutdown(&mut self) {}
}
