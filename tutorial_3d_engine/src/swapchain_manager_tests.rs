//! Unit tests for SwapchainManager
//!
//! Run against MockGraphicsDevice: the mock swapchain rejects
//! `resize_buffers` while any back-buffer view is alive, so a successful
//! resize proves the views were released first.

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockHandle};
use crate::graphics_device::{DeviceContext, GraphicsDevice, SwapchainDesc, TextureFormat};
use crate::swapchain_manager::{ResizeListener, ResizeOutcome, SwapchainManager};

// ============================================================================
// TEST HELPERS
// ============================================================================

#[derive(Default)]
struct RecordingListener {
    sizes: Vec<(u32, u32)>,
}

impl ResizeListener for RecordingListener {
    fn on_swapchain_resized(&mut self, width: u32, height: u32) {
        self.sizes.push((width, height));
    }
}

struct Fixture {
    device: MockGraphicsDevice,
    handle: MockHandle,
    context: Box<dyn DeviceContext>,
    manager: SwapchainManager,
}

fn fixture(depth: Option<TextureFormat>) -> Fixture {
    let mut device = MockGraphicsDevice::new();
    let handle = device.handle();
    let context = device.create_immediate_context().unwrap();
    let manager = SwapchainManager::new(&mut device, &SwapchainDesc::new(800, 600), depth).unwrap();
    handle.clear_calls();
    Fixture { device, handle, context, manager }
}

// ============================================================================
// CREATION TESTS
// ============================================================================

#[test]
fn test_new_creates_color_and_depth_views() {
    let f = fixture(Some(TextureFormat::D32_FLOAT));

    assert!(f.manager.render_target_view().is_some());
    assert!(f.manager.depth_stencil_view().is_some());
    assert_eq!(f.manager.views_created(), 2);
    assert_eq!(f.manager.views_destroyed(), 0);
    assert_eq!(f.manager.buffer_count(), 2);
    assert_eq!(f.manager.format(), TextureFormat::B8G8R8A8_UNORM);
}

#[test]
fn test_new_without_depth() {
    let f = fixture(None);

    assert!(f.manager.render_target_view().is_some());
    assert!(f.manager.depth_stencil_view().is_none());
    assert_eq!(f.manager.views_created(), 1);
}

#[test]
fn test_back_buffer_failure_is_distinct() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));
    f.handle.control(|c| c.fail_back_buffer = true);

    let result = f.manager.create_swapchain_resources(&mut f.device);

    assert!(matches!(result, Err(Error::BackBufferUnavailable(_))));
    assert!(f.manager.render_target_view().is_none());
}

#[test]
fn test_render_target_view_failure_is_distinct() {
    let mut f = fixture(None);
    f.handle.control(|c| c.fail_render_target_view = true);

    let result = f.manager.create_swapchain_resources(&mut f.device);

    assert!(matches!(result, Err(Error::ViewCreationFailed(_))));
}

#[test]
fn test_depth_failure_stores_nothing() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));
    f.handle.control(|c| c.fail_depth_texture = true);

    let result = f.manager.create_swapchain_resources(&mut f.device);

    assert!(matches!(result, Err(Error::ViewCreationFailed(_))));
    assert!(f.manager.render_target_view().is_none());
    assert!(f.manager.depth_stencil_view().is_none());
    assert_eq!(f.manager.views_created(), f.manager.views_destroyed());
    assert_eq!(f.handle.back_buffer_refs(), 0);
}

// ============================================================================
// DESTROY TESTS
// ============================================================================

#[test]
fn test_destroy_is_idempotent() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));

    f.manager.destroy_swapchain_resources();
    f.manager.destroy_swapchain_resources();

    assert_eq!(f.manager.views_destroyed(), 2);
    assert_eq!(f.handle.back_buffer_refs(), 0);
    assert_eq!(f.handle.live_objects().render_target_views, 0);
    assert_eq!(f.handle.live_objects().depth_stencil_views, 0);
}

// ============================================================================
// RESIZE TESTS
// ============================================================================

#[test]
fn test_resize_sequence() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));
    let mut listener = RecordingListener::default();

    let outcome = f
        .manager
        .resize(&mut f.device, f.context.as_mut(), 1024, 768, &mut [&mut listener])
        .unwrap();

    assert_eq!(outcome, ResizeOutcome::Resized { width: 1024, height: 768 });
    assert_eq!(
        f.handle.calls(),
        vec![
            "flush",
            "set_render_targets(none,none)",
            "resize_buffers(1024x768)",
            "back_buffer",
            "create_render_target_view",
            "create_texture(DepthStencil,1024x768)",
            "create_depth_stencil_view",
        ]
    );
    assert_eq!(listener.sizes, vec![(1024, 768)]);
    assert_eq!((f.manager.width(), f.manager.height()), (1024, 768));
}

#[test]
fn test_views_balanced_across_resizes() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));

    for (width, height) in [(640, 480), (1920, 1080), (100, 100)] {
        f.manager.resize(&mut f.device, f.context.as_mut(), width, height, &mut []).unwrap();
        assert_eq!(f.manager.views_created() - f.manager.views_destroyed(), 2);
    }

    assert_eq!(f.manager.views_created(), 8);
    assert_eq!(f.manager.views_destroyed(), 6);
}

#[test]
fn test_zero_size_is_skipped() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));
    let mut listener = RecordingListener::default();

    let outcome = f
        .manager
        .resize(&mut f.device, f.context.as_mut(), 0, 600, &mut [&mut listener])
        .unwrap();

    assert_eq!(outcome, ResizeOutcome::Skipped);
    assert!(f.handle.calls().is_empty());
    assert!(listener.sizes.is_empty());
    assert!(f.manager.render_target_view().is_some());
}

#[test]
fn test_failed_resize_keeps_old_size_and_skips_listeners() {
    let mut f = fixture(Some(TextureFormat::D32_FLOAT));
    let mut listener = RecordingListener::default();
    f.handle.control(|c| c.fail_resize_buffers = true);

    let outcome = f
        .manager
        .resize(&mut f.device, f.context.as_mut(), 1024, 768, &mut [&mut listener])
        .unwrap();

    assert_eq!(outcome, ResizeOutcome::Failed);
    assert!(listener.sizes.is_empty());
    assert_eq!((f.manager.width(), f.manager.height()), (800, 600));
    assert!(f.manager.render_target_view().is_some());
    assert!(f.handle.calls().contains(&"create_texture(DepthStencil,800x600)".to_string()));
}

#[test]
fn test_resize_recovers_after_failure() {
    let mut f = fixture(None);
    f.handle.control(|c| c.fail_resize_buffers = true);
    let first = f.manager.resize(&mut f.device, f.context.as_mut(), 1024, 768, &mut []).unwrap();

    f.handle.control(|c| c.fail_resize_buffers = false);
    let second = f.manager.resize(&mut f.device, f.context.as_mut(), 1024, 768, &mut []).unwrap();

    assert_eq!(first, ResizeOutcome::Failed);
    assert_eq!(second, ResizeOutcome::Resized { width: 1024, height: 768 });
}

#[test]
fn test_resize_propagates_back_buffer_loss() {
    let mut f = fixture(None);
    f.handle.control(|c| c.fail_back_buffer = true);

    let result = f.manager.resize(&mut f.device, f.context.as_mut(), 1024, 768, &mut []);

    assert!(matches!(result, Err(Error::BackBufferUnavailable(_))));
}

#[test]
fn test_resize_notifies_every_listener_in_order() {
    let mut f = fixture(None);
    let mut camera = RecordingListener::default();
    let mut overlay = RecordingListener::default();

    f.manager
        .resize(&mut f.device, f.context.as_mut(), 300, 200, &mut [&mut camera, &mut overlay])
        .unwrap();

    assert_eq!(camera.sizes, vec![(300, 200)]);
    assert_eq!(overlay.sizes, vec![(300, 200)]);
}

#[test]
fn test_present_forwards_sync_interval() {
    let mut f = fixture(None);
    f.manager.present(1).unwrap();
    assert_eq!(f.handle.calls(), vec!["present(1)"]);
}
