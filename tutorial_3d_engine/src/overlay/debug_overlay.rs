/// Debug overlay - rotation toggle plus depth and rasterizer selection
///
/// The overlay only mutates the [`OverlayState`] owned by the application;
/// the render-state catalog turns the new selection into bound states on
/// the next frame.

use crate::engine_debug;
use crate::render_state::{
    RenderStateSelection, CULL_INDEX_BASE, CULL_MODE_LABELS, DEPTH_STATE_LABELS,
};
use super::overlay_ui::OverlayUi;

/// Values edited by the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayState {
    pub selection: RenderStateSelection,
    pub rotation_enabled: bool,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            selection: RenderStateSelection::default(),
            rotation_enabled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugOverlay {
    title: String,
    show_rotation_toggle: bool,
    show_render_states: bool,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self::new("Hello Froge")
    }
}

impl DebugOverlay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            show_rotation_toggle: true,
            show_render_states: true,
        }
    }

    pub fn with_rotation_toggle(mut self, show: bool) -> Self {
        self.show_rotation_toggle = show;
        self
    }

    pub fn with_render_states(mut self, show: bool) -> Self {
        self.show_render_states = show;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Build the overlay window; returns `true` if any value changed
    pub fn build(&self, ui: &mut dyn OverlayUi, state: &mut OverlayState) -> bool {
        let before = *state;
        let show_rotation_toggle = self.show_rotation_toggle;
        let show_render_states = self.show_render_states;

        ui.window(&self.title, &mut |ui: &mut dyn OverlayUi| {
            if show_rotation_toggle {
                ui.checkbox("Toggle Rotation", &mut state.rotation_enabled);
            }
            if !show_render_states {
                return;
            }

            ui.text("Depth State");
            for (index, label) in DEPTH_STATE_LABELS.iter().enumerate() {
                ui.radio_button(label, &mut state.selection.depth_index, index as i32);
            }

            ui.separator();
            ui.text("Rasterizer State");
            ui.checkbox("Wireframe", &mut state.selection.wireframe);
            ui.text("Cull");
            for (offset, label) in CULL_MODE_LABELS.iter().enumerate() {
                ui.radio_button(label, &mut state.selection.cull_index, CULL_INDEX_BASE + offset as i32);
            }
        });

        let changed = *state != before;
        if changed {
            engine_debug!(
                "tutorial3d::DebugOverlay",
                "Selection changed: {} rotation={}",
                state.selection.describe(),
                state.rotation_enabled
            );
        }
        changed
    }
}

#[cfg(test)]
#[path = "debug_overlay_tests.rs"]
mod tests;
