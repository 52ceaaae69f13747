/// Backend-neutral draw data produced by the debug overlay
///
/// Geometry is in overlay pixel space: `display_pos` is the top-left corner
/// and `display_size` the extent. One texture (the font atlas) is used for
/// every command.

use bytemuck::{Pod, Zeroable};

/// One overlay vertex (matches imgui's `DrawVert` layout)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

/// One indexed draw with its scissor rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayDrawCommand {
    /// Number of indices
    pub index_count: u32,
    /// First index in [`OverlayDrawData::indices`]
    pub first_index: u32,
    /// Added to each index before fetching a vertex
    pub vertex_offset: i32,
    /// Clip rectangle (min x, min y, max x, max y) in overlay pixels
    pub clip_rect: [f32; 4],
}

/// Everything needed to draw one overlay frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayDrawData {
    pub display_pos: [f32; 2],
    pub display_size: [f32; 2],
    pub framebuffer_scale: [f32; 2],
    pub vertices: Vec<OverlayVertex>,
    pub indices: Vec<u16>,
    pub commands: Vec<OverlayDrawCommand>,
}

impl OverlayDrawData {
    /// True when nothing would be drawn
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() || self.indices.is_empty()
    }

    /// Orthographic scale and translation mapping overlay pixels to clip space
    pub fn clip_transform(&self) -> ([f32; 2], [f32; 2]) {
        let scale = [2.0 / self.display_size[0], 2.0 / self.display_size[1]];
        let translate = [
            -1.0 - self.display_pos[0] * scale[0],
            -1.0 - self.display_pos[1] * scale[1],
        ];
        (scale, translate)
    }

    /// Clip rectangle of `command` in framebuffer pixels, clamped to the framebuffer
    ///
    /// Returns `None` for empty rectangles.
    pub fn scissor_for(&self, command: &OverlayDrawCommand, width: u32, height: u32) -> Option<[u32; 4]> {
        let [cx0, cy0, cx1, cy1] = command.clip_rect;
        let x0 = ((cx0 - self.display_pos[0]) * self.framebuffer_scale[0]).max(0.0);
        let y0 = ((cy0 - self.display_pos[1]) * self.framebuffer_scale[1]).max(0.0);
        let x1 = ((cx1 - self.display_pos[0]) * self.framebuffer_scale[0]).min(width as f32);
        let y1 = ((cy1 - self.display_pos[1]) * self.framebuffer_scale[1]).min(height as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some([x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32])
    }
}

#[cfg(test)]
#[path = "overlay_draw_tests.rs"]
mod tests;
