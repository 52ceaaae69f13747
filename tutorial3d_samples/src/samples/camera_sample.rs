/// Free-flying camera over the rotating mesh, with the full render-state overlay
///
/// W/S move along the view direction and A/D strafe. Dragging with the left
/// mouse button turns the camera unless imgui has the mouse.

use glam::Vec3;
use tutorial_3d_engine::tutorial3d::app::{AppContext, Application, DeviceResources, InputState, UpdateContext};
use tutorial_3d_engine::tutorial3d::camera::PerspectiveCamera;
use tutorial_3d_engine::tutorial3d::overlay::{DebugOverlay, OverlayState};
use tutorial_3d_engine::tutorial3d::render::{FrameRenderer, ResizeListener, TextureFormat};
use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::{engine_debug, engine_info};
use winit::event::{MouseButton, WindowEvent};
use winit::keyboard::KeyCode;

use super::common::{self, not_loaded};
use super::textured_scene::TexturedScene;
use crate::args::SampleArgs;

pub const FOV_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 2048.0;

/// Distance moved per frame while a movement key is held
pub const MOVE_SPEED: f32 = 0.1;

/// Degrees turned per pixel of mouse movement
pub const LOOK_SENSITIVITY: f32 = 0.1;

pub const START_POSITION: Vec3 = Vec3::new(0.0, 2.0, -6.0);

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::D24_UNORM_S8_UINT;

pub struct CameraSample {
    args: SampleArgs,
    frame: FrameRenderer,
    debug_overlay: DebugOverlay,
    overlay_state: OverlayState,
    camera: PerspectiveCamera,
    angle: f32,
    scene: Option<TexturedScene>,
    resources: Option<DeviceResources>,
}

impl CameraSample {
    pub fn new(args: SampleArgs) -> Self {
        let mut camera = PerspectiveCamera::new(FOV_DEGREES, 1, 1, NEAR_PLANE, FAR_PLANE);
        camera.set_position(START_POSITION);
        camera.set_direction(-START_POSITION);

        Self {
            args,
            frame: FrameRenderer::new(),
            debug_overlay: DebugOverlay::default(),
            overlay_state: OverlayState::default(),
            camera,
            angle: 0.0,
            scene: None,
            resources: None,
        }
    }
}

/// Move and turn `camera` from this frame's input
pub fn apply_camera_input(camera: &mut PerspectiveCamera, input: &InputState, overlay_wants_mouse: bool) {
    if input.is_key_down(KeyCode::KeyW) {
        camera.move_forward(MOVE_SPEED);
    }
    if input.is_key_down(KeyCode::KeyS) {
        camera.move_forward(-MOVE_SPEED);
    }
    if input.is_key_down(KeyCode::KeyA) {
        camera.slide(-MOVE_SPEED);
    }
    if input.is_key_down(KeyCode::KeyD) {
        camera.slide(MOVE_SPEED);
    }

    if input.is_button_down(MouseButton::Left) && !overlay_wants_mouse {
        let delta = input.delta_position();
        camera.add_yaw(delta.x * LOOK_SENSITIVITY);
        // Screen Y grows downwards
        camera.add_pitch(-delta.y * LOOK_SENSITIVITY);
    }
}

impl Application for CameraSample {
    fn initialize(&mut self, context: &mut AppContext<'_>) -> Result<()> {
        let resources = common::create_device_resources(context, &self.args, Some(DEPTH_FORMAT))?;
        let swapchain = resources.swapchain();
        self.camera.resize(swapchain.width(), swapchain.height());
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

        let overlay_wants_mouse = self.scene.as_ref().is_some_and(|scene| scene.overlay.wants_mouse());
        apply_camera_input(&mut self.camera, context.input, overlay_wants_mouse);

        self.angle = common::advance_rotation(self.angle, self.overlay_state.rotation_enabled);
    }

    fn render(&mut self) -> Result<()> {
        let (Some(resources), Some(scene)) = (self.resources.as_mut(), self.scene.as_mut()) else {
            return Err(not_loaded("render"));
        };

        let debug_overlay = &self.debug_overlay;
        let overlay_state = &mut self.overlay_state;
        let mut changed = false;
        scene.overlay.frame(|ui| {
            changed = debug_overlay.build(ui, overlay_state);
        });
        if changed {
            engine_debug!(
                "tutorial3d::samples::camera",
                "Render states: {}",
                self.overlay_state.selection.describe()
            );
        }

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
            "tutorial3d::samples::camera",
            "Shut down after {} frames ({} abandoned)",
            self.frame.frames_presented(),
            self.frame.frames_abandoned()
        );
    }
}

#[cfg(test)]
#[path = "camera_sample_tests.rs"]
mod tests;
