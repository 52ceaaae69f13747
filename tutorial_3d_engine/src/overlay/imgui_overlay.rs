/// imgui-backed overlay
///
/// Owns the imgui context and the font atlas texture. Each frame the UI is
/// built through [`OverlayUi`], then imgui's draw lists are flattened into a
/// single [`OverlayDrawData`] that any device context can draw.

use std::sync::Arc;
use std::time::{Duration, Instant};

use imgui::{Condition, DrawCmd, DrawData, TextureId};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, OverlayDrawCommand, OverlayDrawData, OverlayVertex, Texture, TextureDesc,
    TextureFormat, TextureUsage,
};
use crate::swapchain_manager::ResizeListener;
use crate::{engine_debug, engine_error, engine_trace};
use super::overlay_ui::OverlayUi;

/// Pixels scrolled per wheel line
const PIXELS_PER_LINE: f32 = 20.0;

pub struct ImguiOverlay {
    context: imgui::Context,
    font_texture: Arc<dyn Texture>,
    draw_data: OverlayDrawData,
    last_frame: Instant,
}

impl ImguiOverlay {
    /// Create the imgui context and upload the font atlas
    pub fn new(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context.io_mut().display_size = [width as f32, height as f32];
        context.io_mut().display_framebuffer_scale = [1.0, 1.0];

        let (atlas_width, atlas_height, pixels) = {
            let atlas = context.fonts().build_rgba32_texture();
            (atlas.width, atlas.height, atlas.data.to_vec())
        };

        let font_texture = device
            .create_texture(TextureDesc {
                width: atlas_width,
                height: atlas_height,
                format: TextureFormat::R8G8B8A8_UNORM,
                usage: TextureUsage::Sampled,
                data: Some(pixels),
            })
            .map_err(|e| {
                engine_error!("tutorial3d::ImguiOverlay", "Failed to create font atlas texture: {}", e);
                e
            })?;
        context.fonts().tex_id = TextureId::new(0);

        engine_debug!(
            "tutorial3d::ImguiOverlay",
            "Font atlas uploaded ({}x{})",
            atlas_width,
            atlas_height
        );

        Ok(Self {
            context,
            font_texture,
            draw_data: OverlayDrawData::default(),
            last_frame: Instant::now(),
        })
    }

    pub fn font_texture(&self) -> &Arc<dyn Texture> {
        &self.font_texture
    }

    /// Draw data of the last built frame
    pub fn draw_data(&self) -> &OverlayDrawData {
        &self.draw_data
    }

    /// True while the cursor is over an overlay window
    pub fn wants_mouse(&self) -> bool {
        self.context.io().want_capture_mouse
    }

    pub fn display_size(&self) -> [f32; 2] {
        self.context.io().display_size
    }

    /// Forward mouse input from the window
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        let io = self.context.io_mut();
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                io.add_mouse_pos_event([position.x as f32, position.y as f32]);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = to_imgui_button(*button) {
                    io.add_mouse_button_event(button, *state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let [x, y] = match delta {
                    MouseScrollDelta::LineDelta(x, y) => [*x, *y],
                    MouseScrollDelta::PixelDelta(pos) => {
                        [pos.x as f32 / PIXELS_PER_LINE, pos.y as f32 / PIXELS_PER_LINE]
                    }
                };
                io.add_mouse_wheel_event([x, y]);
            }
            WindowEvent::CursorLeft { .. } => {
                io.add_mouse_pos_event([-f32::MAX, -f32::MAX]);
            }
            _ => {}
        }
    }

    /// Run one UI frame and convert its output
    pub fn frame(&mut self, build: impl FnOnce(&mut dyn OverlayUi)) -> &OverlayDrawData {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).max(Duration::from_micros(1));
        self.last_frame = now;
        self.context.io_mut().update_delta_time(delta);

        let ui = self.context.new_frame();
        let mut wrapper = ImguiUi { ui };
        build(&mut wrapper);

        let draw_data = self.context.render();
        self.draw_data = convert_draw_data(draw_data);
        engine_trace!(
            "tutorial3d::ImguiOverlay",
            "Overlay frame: {} vertices, {} commands",
            self.draw_data.vertices.len(),
            self.draw_data.commands.len()
        );
        &self.draw_data
    }
}

impl ResizeListener for ImguiOverlay {
    fn on_swapchain_resized(&mut self, width: u32, height: u32) {
        self.context.io_mut().display_size = [width as f32, height as f32];
    }
}

/// Flatten imgui draw lists into one vertex and index array
///
/// Indices stay list-local; each command carries the vertex offset of its
/// list so the u16 indices keep their range.
pub fn convert_draw_data(draw_data: &DrawData) -> OverlayDrawData {
    let mut data = OverlayDrawData {
        display_pos: draw_data.display_pos,
        display_size: draw_data.display_size,
        framebuffer_scale: draw_data.framebuffer_scale,
        ..OverlayDrawData::default()
    };
    if draw_data.display_size.iter().any(|size| *size <= 0.0) {
        return data;
    }

    for draw_list in draw_data.draw_lists() {
        let vertex_base = data.vertices.len();
        let index_base = data.indices.len();

        data.vertices.extend(draw_list.vtx_buffer().iter().map(|v| OverlayVertex {
            position: v.pos,
            uv: v.uv,
            color: v.col,
        }));
        data.indices.extend_from_slice(draw_list.idx_buffer());

        for command in draw_list.commands() {
            match command {
                DrawCmd::Elements { count, cmd_params } => {
                    data.commands.push(OverlayDrawCommand {
                        index_count: count as u32,
                        first_index: (index_base + cmd_params.idx_offset) as u32,
                        vertex_offset: (vertex_base + cmd_params.vtx_offset) as i32,
                        clip_rect: cmd_params.clip_rect,
                    });
                }
                DrawCmd::ResetRenderState | DrawCmd::RawCallback { .. } => {}
            }
        }
    }
    data
}

fn to_imgui_button(button: MouseButton) -> Option<imgui::MouseButton> {
    match button {
        MouseButton::Left => Some(imgui::MouseButton::Left),
        MouseButton::Right => Some(imgui::MouseButton::Right),
        MouseButton::Middle => Some(imgui::MouseButton::Middle),
        MouseButton::Back => Some(imgui::MouseButton::Extra1),
        MouseButton::Forward => Some(imgui::MouseButton::Extra2),
        MouseButton::Other(_) => None,
    }
}

/// [`OverlayUi`] over an imgui frame
struct ImguiUi<'ui> {
    ui: &'ui imgui::Ui,
}

impl OverlayUi for ImguiUi<'_> {
    fn window(&mut self, title: &str, build: &mut dyn FnMut(&mut dyn OverlayUi)) {
        let ui = self.ui;
        ui.window(title)
            .position([10.0, 10.0], Condition::FirstUseEver)
            .always_auto_resize(true)
            .build(|| build(self));
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        self.ui.checkbox(label, value)
    }

    fn radio_button(&mut self, label: &str, value: &mut i32, button_value: i32) -> bool {
        self.ui.radio_button(label, value, button_value)
    }

    fn text(&mut self, text: &str) {
        self.ui.text(text);
    }

    fn separator(&mut self) {
        self.ui.separator();
    }
}

#[cfg(test)]
#[path = "imgui_overlay_tests.rs"]
mod tests;
