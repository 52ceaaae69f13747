//! Debug overlay - render-state controls drawn on top of the scene

mod overlay_ui;
mod debug_overlay;
mod imgui_overlay;

pub use overlay_ui::OverlayUi;
pub use debug_overlay::{DebugOverlay, OverlayState};
pub use imgui_overlay::{ImguiOverlay, convert_draw_data};
