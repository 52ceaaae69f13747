//! Unit tests for DeviceResources

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockHandle};
use crate::graphics_device::{SwapchainDesc, TextureFormat};
use crate::swapchain_manager::{ResizeListener, ResizeOutcome};
use super::*;

fn create_resources() -> (DeviceResources, MockHandle) {
    let device = MockGraphicsDevice::new();
    let handle = device.handle();
    let resources = DeviceResources::from_device(
        Box::new(device),
        &SwapchainDesc::new(800, 600),
        Some(TextureFormat::D32_FLOAT),
    )
    .unwrap();
    (resources, handle)
}

#[derive(Default)]
struct SizeRecorder {
    sizes: Vec<(u32, u32)>,
}

impl ResizeListener for SizeRecorder {
    fn on_swapchain_resized(&mut self, width: u32, height: u32) {
        self.sizes.push((width, height));
    }
}

#[test]
fn test_from_device_creates_context_and_swapchain() {
    let (resources, handle) = create_resources();

    assert_eq!(resources.swapchain().width(), 800);
    assert!(resources.swapchain().render_target_view().is_some());
    assert!(resources.swapchain().depth_stencil_view().is_some());
    assert!(handle.calls().contains(&"create_swapchain(800x600)".to_string()));
}

#[test]
fn test_from_device_fails_without_back_buffer() {
    let device = MockGraphicsDevice::new();
    device.handle().control(|c| c.fail_back_buffer = true);

    let result = DeviceResources::from_device(Box::new(device), &SwapchainDesc::new(800, 600), None);

    assert!(matches!(result, Err(Error::BackBufferUnavailable(_))));
}

#[test]
fn test_resize_notifies_listeners() {
    let (mut resources, _handle) = create_resources();
    let mut recorder = SizeRecorder::default();

    let outcome = resources.resize(1024, 768, &mut [&mut recorder]).unwrap();

    assert_eq!(outcome, ResizeOutcome::Resized { width: 1024, height: 768 });
    assert_eq!(recorder.sizes, vec![(1024, 768)]);
    assert_eq!(resources.swapchain().height(), 768);
}

#[test]
fn test_parts_borrow_together() {
    let (mut resources, handle) = create_resources();
    handle.clear_calls();

    let (_device, context, swapchain) = resources.parts();
    context.flush().unwrap();
    swapchain.present(1).unwrap();

    assert_eq!(handle.calls(), vec!["flush", "present(1)"]);
}

#[test]
fn test_drop_releases_everything() {
    let (resources, handle) = create_resources();
    handle.clear_calls();

    drop(resources);

    let calls = handle.calls();
    let flush = calls.iter().position(|c| c == "flush").unwrap();
    let unbind = calls.iter().position(|c| c == "set_render_targets(none,none)").unwrap();
    let idle = calls.iter().position(|c| c == "wait_idle").unwrap();
    assert!(flush < unbind && unbind < idle);
    assert_eq!(handle.back_buffer_refs(), 0);
    assert!(handle.live_objects().is_clean(), "{}", handle.live_objects());
}
