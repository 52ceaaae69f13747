/// Per-frame keyboard and mouse state

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Default)]
pub struct InputState {
    keys_down: FxHashSet<KeyCode>,
    keys_pressed: FxHashSet<KeyCode>,
    buttons_down: FxHashSet<MouseButton>,
    buttons_pressed: FxHashSet<MouseButton>,
    cursor_position: Option<Vec2>,
    cursor_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from a window event
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed if !event.repeat => self.press_key(code),
                        ElementState::Pressed => {}
                        ElementState::Released => self.release_key(code),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button),
                ElementState::Released => self.release_button(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_position = None;
            }
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.buttons_down.clear();
            }
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        if self.buttons_down.insert(button) {
            self.buttons_pressed.insert(button);
        }
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons_down.remove(&button);
    }

    /// Record a new cursor position; the first position produces no delta
    pub fn move_cursor(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if let Some(previous) = self.cursor_position {
            self.cursor_delta += position - previous;
        }
        self.cursor_position = Some(position);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Went down since the last [`end_frame`](Self::end_frame)
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_position
    }

    /// Cursor movement accumulated this frame, in pixels
    pub fn delta_position(&self) -> Vec2 {
        self.cursor_delta
    }

    /// Reset per-frame state
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.cursor_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
