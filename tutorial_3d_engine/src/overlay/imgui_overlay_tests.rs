//! Unit tests for ImguiOverlay
//!
//! imgui allows one live context at a time, so every test is serial.

use serial_test::serial;

use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{TextureFormat, TextureUsage};
use crate::overlay::{DebugOverlay, ImguiOverlay, OverlayState};
use crate::swapchain_manager::ResizeListener;

#[test]
#[serial]
fn test_new_uploads_font_atlas() {
    let mut device = MockGraphicsDevice::new();
    let handle = device.handle();

    let overlay = ImguiOverlay::new(&mut device, 800, 600).unwrap();

    let info = overlay.font_texture().info();
    assert!(info.width > 0 && info.height > 0);
    assert_eq!(info.format, TextureFormat::R8G8B8A8_UNORM);
    assert_eq!(info.usage, TextureUsage::Sampled);
    assert!(handle.calls().iter().any(|c| c.starts_with("create_texture(Sampled")));
    assert_eq!(overlay.display_size(), [800.0, 600.0]);
}

#[test]
#[serial]
fn test_frame_produces_draw_data() {
    let mut device = MockGraphicsDevice::new();
    let mut overlay = ImguiOverlay::new(&mut device, 800, 600).unwrap();
    let debug_overlay = DebugOverlay::default();
    let mut state = OverlayState::default();

    let data = overlay.frame(|ui| {
        debug_overlay.build(ui, &mut state);
    });

    assert!(!data.is_empty());
    assert_eq!(data.display_size, [800.0, 600.0]);
    let index_total: u32 = data.commands.iter().map(|c| c.index_count).sum();
    assert_eq!(index_total as usize, data.indices.len());
    for command in &data.commands {
        assert!((command.first_index + command.index_count) as usize <= data.indices.len());
        assert!((command.vertex_offset as usize) < data.vertices.len());
    }
    assert!(!overlay.wants_mouse());
}

#[test]
#[serial]
fn test_empty_frame_has_no_commands() {
    let mut device = MockGraphicsDevice::new();
    let mut overlay = ImguiOverlay::new(&mut device, 640, 480).unwrap();

    let data = overlay.frame(|_| {});

    assert!(data.is_empty());
}

#[test]
#[serial]
fn test_resize_updates_display_size() {
    let mut device = MockGraphicsDevice::new();
    let mut overlay = ImguiOverlay::new(&mut device, 800, 600).unwrap();

    overlay.on_swapchain_resized(1024, 768);

    assert_eq!(overlay.display_size(), [1024.0, 768.0]);
    let data = overlay.frame(|_| {});
    assert_eq!(data.display_size, [1024.0, 768.0]);
}

#[test]
#[serial]
fn test_failed_font_upload_propagates() {
    let mut device = MockGraphicsDevice::new();
    device.handle().control(|c| c.fail_sampled_texture = true);

    assert!(ImguiOverlay::new(&mut device, 800, 600).is_err());
}

#[test]
#[serial]
fn test_context_released_on_drop() {
    let mut device = MockGraphicsDevice::new();
    let overlay = ImguiOverlay::new(&mut device, 800, 600).unwrap();
    drop(overlay);

    // A second context can only be created once the first is gone
    assert!(ImguiOverlay::new(&mut device, 800, 600).is_ok());
}
