/// Rotating textured mesh with an imgui window toggling the rotation

use glam::Vec3;
use tutorial_3d_engine::tutorial3d::app::{AppContext, Application, DeviceResources, UpdateContext};
use tutorial_3d_engine::tutorial3d::camera::PerspectiveCamera;
use tutorial_3d_engine::tutorial3d::overlay::{DebugOverlay, OverlayState};
use tutorial_3d_engine::tutorial3d::render::{FrameRenderer, ResizeListener, DEPTH_INDEX_DISABLED};
use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::engine_info;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

use super::common::{self, not_loaded};
use super::textured_scene::TexturedScene;
use crate::args::SampleArgs;

/// Fixed viewpoint in front of the mesh
pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 1.5, -4.0);

pub struct OverlaySample {
    args: SampleArgs,
    frame: FrameRenderer,
    debug_overlay: DebugOverlay,
    overlay_state: OverlayState,
    camera: PerspectiveCamera,
    angle: f32,
    scene: Option<TexturedScene>,
    resources: Option<DeviceResources>,
}

impl OverlaySample {
    pub fn new(args: SampleArgs) -> Self {
        let mut overlay_state = OverlayState::default();
        // No depth buffer in this sample
        overlay_state.selection.depth_index = DEPTH_INDEX_DISABLED;

        Self {
            args,
            frame: FrameRenderer::new(),
            debug_overlay: DebugOverlay::default().with_render_states(false),
            overlay_state,
            camera: PerspectiveCamera::new(60.0, 1, 1, 0.1, 100.0),
            angle: 0.0,
            scene: None,
            resources: None,
        }
    }
}

impl Application for OverlaySample {
    fn initialize(&mut self, context: &mut AppContext<'_>) -> Result<()> {
        let resources = common::create_device_resources(context, &self.args, None)?;
        let swapchain = resources.swapchain();
        self.camera.resize(swapchain.width(), swapchain.height());
        self.camera.set_position(CAMERA_POSITION);
        self.camera.set_direction(-CAMERA_POSITION);
        self.resources = Some(resources);
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        let resources = self.resources.as_mut().ok_or_else(|| not_loaded("load"))?;
        self.scene = Some(TexturedScene::load(resources, &self.args)?);
        Ok(())
    }

    fn update(&mut self, context: &mut UpdateContext<'_>) {
        if context.input.is_key_pressed(KeyCode::Escape) {
            context.request_exit();
        }
        self.angle = common::advance_rotation(self.angle, self.overlay_state.rotation_enabled);
    }

    fn render(&mut self) -> Result<()> {
        let (Some(resources), Some(scene)) = (self.resources.as_mut(), self.scene.as_mut()) else {
            return Err(not_loaded("render"));
        };

        let debug_overlay = &self.debug_overlay;
        let overlay_state = &mut self.overlay_state;
        scene.overlay.frame(|ui| {
            debug_overlay.build(ui, overlay_state);
        });

        let (_, context, swapchain) = resources.parts();
        scene.update_constants(context, &mut self.camera, self.angle)?;
        scene.render_frame(&mut self.frame, context, swapchain, &self.overlay_state.selection)
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        match self.scene.as_mut() {
            Some(scene) => {
                let mut listeners: [&mut dyn ResizeListener; 2] = [&mut self.camera, &mut scene.overlay];
                common::resize(&mut self.resources, width, height, &mut listeners);
            }
            None => {
                let mut listeners: [&mut dyn ResizeListener; 1] = [&mut self.camera];
                common::resize(&mut self.resources, width, height, &mut listeners);
            }
        }
    }

    fn on_window_event(&mut self, event: &WindowEvent) {
        if let Some(scene) = self.scene.as_mut() {
            scene.overlay.handle_window_event(event);
        }
    }

    fn shutdown(&mut self) {
        self.scene = None;
        self.resources = None;
        engine_info!(
            "tutorial3d::samples::overlay",
            "Shut down after {} frames",
            self.frame.frames_presented()
        );
    }
}

#[cfg(test)]
#[path = "overlay_sample_tests.rs"]
mod tests;
