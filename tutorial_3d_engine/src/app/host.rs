/// Application host - drives an [`Application`] from winit's event loop

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::error::{Error, Result};
use crate::{engine_error, engine_info, engine_warn};
use super::application::{Application, AppConfig, AppContext, UpdateContext};
use super::input::InputState;

/// What the host does with an error returned from `Application::render`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFailure {
    /// No back buffer this frame; try again next frame
    SkipFrame,
    /// Log and keep running; the next frame starts from scratch
    AbandonFrame,
    /// Stop the event loop and return the error from `run`
    Fatal,
}

impl RenderFailure {
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::BackBufferUnavailable(_) => RenderFailure::SkipFrame,
            Error::DeviceLost | Error::OutOfMemory => RenderFailure::Fatal,
            _ => RenderFailure::AbandonFrame,
        }
    }
}

pub struct ApplicationHost<A: Application> {
    app: A,
    config: AppConfig,
    window: Option<Arc<Window>>,
    input: InputState,
    last_frame: Instant,
    frame_index: u64,
    running: bool,
    error: Option<Error>,
}

impl<A: Application> ApplicationHost<A> {
    pub fn new(app: A, config: AppConfig) -> Self {
        Self {
            app,
            config,
            window: None,
            input: InputState::new(),
            last_frame: Instant::now(),
            frame_index: 0,
            running: false,
            error: None,
        }
    }

    /// Run until the window closes; returns the first initialization error
    /// or fatal render error
    pub fn run(app: A, config: AppConfig) -> Result<()> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut host = Self::new(app, config);
        event_loop
            .run_app(&mut host)
            .map_err(|e| Error::BackendError(format!("Event loop failed: {}", e)))?;

        match host.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, stage: &str, error: Error) {
        engine_error!("tutorial3d::ApplicationHost", "{} failed: {}", stage, error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?,
        );
        self.window = Some(Arc::clone(&window));

        let mut context = AppContext {
            window: &window,
            config: &self.config,
        };
        self.app.initialize(&mut context)?;
        self.running = true;
        self.app.load()?;

        engine_info!("tutorial3d::ApplicationHost", "'{}' started", self.config.title);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let mut context = UpdateContext::new(&self.input, delta_time, self.frame_index);
        self.app.update(&mut context);
        let exit_requested = context.exit_requested();
        self.input.end_frame();
        self.frame_index += 1;

        // Nothing to present while minimized
        let minimized = self
            .window
            .as_ref()
            .is_some_and(|window| {
                let size = window.inner_size();
                size.width == 0 || size.height == 0
            });
        if !minimized {
            if let Err(e) = self.app.render() {
                match RenderFailure::classify(&e) {
                    // The pending resize event rebuilds the swapchain
                    RenderFailure::SkipFrame => {
                        engine_warn!("tutorial3d::ApplicationHost", "Frame {} skipped: {}", self.frame_index, e);
                    }
                    RenderFailure::AbandonFrame => {
                        engine_error!("tutorial3d::ApplicationHost", "Frame {} abandoned: {}", self.frame_index, e);
                    }
                    RenderFailure::Fatal => {
                        self.fail(event_loop, "render", e);
                        return;
                    }
                }
            }
        }
        if exit_requested {
            event_loop.exit();
        }
    }
}

impl<A: Application> ApplicationHandler for ApplicationHost<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, "initialize", e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if !self.running {
            return;
        }

        self.input.handle_window_event(&event);
        self.app.on_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.app.on_resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let (true, Some(window)) = (self.running, &self.window) {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.running {
            self.running = false;
            self.app.shutdown();
            engine_info!("tutorial3d::ApplicationHost", "'{}' shut down after {} frames", self.config.title, self.frame_index);
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
