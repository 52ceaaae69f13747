//! Unit tests for FrameRenderer
//!
//! Checks the command order recorded by the mock device and the
//! abandonment rules for out-of-order calls and backend failures.

use std::sync::Arc;

use crate::error::Error;
use crate::frame::{DrawCall, FramePhase, FrameBindings, FrameRenderer};
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockHandle};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, DeviceContext, GraphicsDevice, IndexType, OverlayDrawCommand,
    OverlayDrawData, Pipeline, PipelineDesc, PrimitiveTopology, SamplerDesc, ShaderSource,
    SwapchainDesc, Texture, TextureDesc, TextureFormat, TextureUsage, VertexLayoutKind,
    VertexPositionColorUv,
};
use crate::render_state::{RenderStateCatalog, RenderStateSelection};
use crate::swapchain_manager::SwapchainManager;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Scene {
    device: MockGraphicsDevice,
    handle: MockHandle,
    context: Box<dyn DeviceContext>,
    swapchain: SwapchainManager,
    pipeline: Arc<dyn Pipeline>,
    vertex_buffer: Arc<dyn Buffer>,
    index_buffer: Arc<dyn Buffer>,
    font: Arc<dyn Texture>,
}

fn scene() -> Scene {
    let mut device = MockGraphicsDevice::new();
    let handle = device.handle();
    let context = device.create_immediate_context().unwrap();
    let swapchain = SwapchainManager::new(&mut device, &SwapchainDesc::new(800, 600), Some(TextureFormat::D32_FLOAT)).unwrap();
    let pipeline = device
        .create_pipeline(PipelineDesc {
            vertex_shader: ShaderSource::new("", "vs_main"),
            fragment_shader: ShaderSource::new("", "fs_main"),
            vertex_layout: VertexLayoutKind::PositionColorUv,
            topology: PrimitiveTopology::TriangleList,
            color_format: TextureFormat::B8G8R8A8_UNORM,
            depth_format: Some(TextureFormat::D32_FLOAT),
        })
        .unwrap();
    let vertices = [VertexPositionColorUv { position: [0.0; 3], color: [1.0; 3], uv: [0.0; 2] }; 3];
    let vertex_buffer = device.create_buffer(BufferDesc::with_data(BufferUsage::Vertex, &vertices)).unwrap();
    let index_buffer = device.create_buffer(BufferDesc::with_data(BufferUsage::Index, &[0u16, 1, 2])).unwrap();
    let font = device
        .create_texture(TextureDesc {
            width: 1,
            height: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: TextureUsage::Sampled,
            data: Some(vec![255; 4]),
        })
        .unwrap();
    handle.clear_calls();
    Scene { device, handle, context, swapchain, pipeline, vertex_buffer, index_buffer, font }
}

fn overlay_data() -> OverlayDrawData {
    OverlayDrawData {
        display_size: [800.0, 600.0],
        framebuffer_scale: [1.0, 1.0],
        indices: vec![0, 1, 2],
        commands: vec![OverlayDrawCommand { index_count: 3, first_index: 0, vertex_offset: 0, clip_rect: [0.0, 0.0, 800.0, 600.0] }],
        ..Default::default()
    }
}

// ============================================================================
// SEQUENCE TESTS
// ============================================================================

#[test]
fn test_full_frame_order() {
    let mut s = scene();
    let mut device = s.device;
    let catalog = RenderStateCatalog::load(&mut device).unwrap();
    let selection = RenderStateSelection::default();
    let camera = device.create_buffer(BufferDesc { size: 192, usage: BufferUsage::Constant, data: None }).unwrap();
    let sampler = device.create_sampler(SamplerDesc::default()).unwrap();
    s.handle.clear_calls();

    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    assert_eq!(frame.phase(), FramePhase::Cleared);

    let constant_buffers = [(0, &camera)];
    let mut bindings = FrameBindings::new(&s.pipeline);
    bindings.render_states = Some((&catalog, &selection));
    bindings.vertex_buffer = Some(&s.vertex_buffer);
    bindings.index_buffer = Some((&s.index_buffer, IndexType::U16));
    bindings.constant_buffers = &constant_buffers;
    bindings.texture = Some(&s.font);
    bindings.sampler = Some(&sampler);
    frame.bind(s.context.as_mut(), &bindings).unwrap();
    assert_eq!(frame.phase(), FramePhase::Bound);

    frame.draw(s.context.as_mut(), DrawCall::Indexed { index_count: 3, first_index: 0, base_vertex: 0 }).unwrap();
    frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font).unwrap();
    frame.present(&mut s.swapchain).unwrap();

    assert_eq!(frame.phase(), FramePhase::Presented);
    assert_eq!(frame.frames_presented(), 1);
    assert_eq!(frame.frames_abandoned(), 0);
    assert_eq!(
        s.handle.calls(),
        vec![
            "set_render_targets(color,depth)",
            "set_viewport(800x600)",
            "clear_render_target([0.1, 0.1, 0.1, 1.0])",
            "clear_depth_stencil(ClearFlags(DEPTH | STENCIL),1,0)",
            "set_pipeline",
            "set_depth_stencil_state(Less)",
            "set_rasterizer_state(Solid,Back)",
            "set_vertex_buffer(0)",
            "set_index_buffer(U16)",
            "set_constant_buffer(0)",
            "set_texture(0)",
            "set_sampler(0)",
            "draw_indexed(3)",
            "draw_overlay(1)",
            "present(1)",
        ]
    );
}

#[test]
fn test_frame_without_depth_or_overlay() {
    let mut device = MockGraphicsDevice::new();
    let handle = device.handle();
    let mut context = device.create_immediate_context().unwrap();
    let mut swapchain = SwapchainManager::new(&mut device, &SwapchainDesc::new(640, 480), None).unwrap();
    let pipeline = device
        .create_pipeline(PipelineDesc {
            vertex_shader: ShaderSource::new("", "vs_main"),
            fragment_shader: ShaderSource::new("", "fs_main"),
            vertex_layout: VertexLayoutKind::PositionColor,
            topology: PrimitiveTopology::TriangleList,
            color_format: TextureFormat::B8G8R8A8_UNORM,
            depth_format: None,
        })
        .unwrap();
    handle.clear_calls();

    let mut frame = FrameRenderer::new().with_clear_color([0.0, 0.0, 0.0, 1.0]);
    frame.begin_frame();
    frame.clear(context.as_mut(), &swapchain).unwrap();
    frame.bind(context.as_mut(), &FrameBindings::new(&pipeline)).unwrap();
    frame.draw(context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.present(&mut swapchain).unwrap();

    let calls = handle.calls();
    assert!(!calls.iter().any(|c| c.starts_with("clear_depth_stencil")));
    assert_eq!(calls.first().map(String::as_str), Some("set_render_targets(color,none)"));
    assert_eq!(calls.last().map(String::as_str), Some("present(1)"));
}

#[test]
fn test_repeated_draws_and_consecutive_frames() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();

    for _ in 0..3 {
        frame.begin_frame();
        frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
        frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
        frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
        frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 3 }).unwrap();
        frame.present(&mut s.swapchain).unwrap();
    }

    assert_eq!(frame.frames_presented(), 3);
    assert_eq!(s.context.draw_call_count(), 6);
}

// ============================================================================
// OUT-OF-ORDER TESTS
// ============================================================================

#[test]
fn test_draw_before_bind_is_rejected() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();

    let result = frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 });

    assert!(matches!(result, Err(Error::InvalidFrameState(_))));
    assert_eq!(frame.phase(), FramePhase::Idle);
    assert_eq!(frame.frames_abandoned(), 1);
    assert!(!s.handle.calls().iter().any(|c| c.starts_with("draw")));
}

#[test]
fn test_present_without_draw_is_rejected() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();

    let result = frame.present(&mut s.swapchain);

    assert!(matches!(result, Err(Error::InvalidFrameState(_))));
    assert!(!s.handle.calls().iter().any(|c| c.starts_with("present")));
    assert_eq!(frame.frames_presented(), 0);
}

#[test]
fn test_overlay_before_draw_is_rejected() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();

    let result = frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font);

    assert!(matches!(result, Err(Error::InvalidFrameState(_))));
}

#[test]
fn test_second_overlay_is_rejected() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font).unwrap();

    let result = frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font);

    assert!(matches!(result, Err(Error::InvalidFrameState(_))));
    assert_eq!(frame.phase(), FramePhase::Idle);
}

#[test]
fn test_draw_after_overlay_is_rejected() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font).unwrap();

    let result = frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 });

    assert!(matches!(result, Err(Error::InvalidFrameState(_))));
    assert_eq!(frame.phase(), FramePhase::Idle);
    assert_eq!(frame.frames_abandoned(), 1);
    assert!(matches!(frame.present(&mut s.swapchain), Err(Error::InvalidFrameState(_))));
    let calls = s.handle.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("draw(")).count(), 1);
    assert!(!calls.iter().any(|c| c.starts_with("present")));
}

#[test]
fn test_overlay_is_last_before_present() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font).unwrap();
    frame.present(&mut s.swapchain).unwrap();

    let calls = s.handle.calls();
    let overlay = calls.iter().position(|c| c.starts_with("draw_overlay")).unwrap();
    let last_draw = calls.iter().rposition(|c| c.starts_with("draw(")).unwrap();
    let present = calls.iter().position(|c| c.starts_with("present")).unwrap();
    assert!(last_draw < overlay);
    assert_eq!(present, overlay + 1);
}

#[test]
fn test_full_frame_after_abandon_presents() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    assert!(frame.present(&mut s.swapchain).is_err());
    assert_eq!(frame.frames_abandoned(), 1);

    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.draw_overlay(s.context.as_mut(), &overlay_data(), &s.font).unwrap();
    frame.present(&mut s.swapchain).unwrap();

    assert_eq!(frame.phase(), FramePhase::Presented);
    assert_eq!(frame.frames_presented(), 1);
    assert_eq!(frame.frames_abandoned(), 1);
}

#[test]
fn test_clear_requires_begin_frame_after_present() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.present(&mut s.swapchain).unwrap();

    assert!(matches!(frame.clear(s.context.as_mut(), &s.swapchain), Err(Error::InvalidFrameState(_))));

    frame.begin_frame();
    assert!(frame.clear(s.context.as_mut(), &s.swapchain).is_ok());
}

#[test]
fn test_begin_frame_counts_unfinished_frame() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();

    frame.begin_frame();

    assert_eq!(frame.phase(), FramePhase::Idle);
    assert_eq!(frame.frames_abandoned(), 1);
}

// ============================================================================
// BACKEND FAILURE TESTS
// ============================================================================

#[test]
fn test_draw_failure_abandons_frame() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    s.handle.control(|c| c.fail_draw = true);

    let result = frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 });

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(frame.phase(), FramePhase::Idle);
    assert_eq!(frame.frames_abandoned(), 1);

    s.handle.control(|c| c.fail_draw = false);
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    frame.present(&mut s.swapchain).unwrap();
    assert_eq!(frame.frames_presented(), 1);
    assert_eq!(frame.frames_abandoned(), 1);
}

#[test]
fn test_present_failure_abandons_frame() {
    let mut s = scene();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();
    frame.clear(s.context.as_mut(), &s.swapchain).unwrap();
    frame.bind(s.context.as_mut(), &FrameBindings::new(&s.pipeline)).unwrap();
    frame.draw(s.context.as_mut(), DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 }).unwrap();
    s.handle.control(|c| c.fail_present = true);

    assert!(frame.present(&mut s.swapchain).is_err());
    assert_eq!(frame.frames_presented(), 0);
    assert_eq!(frame.frames_abandoned(), 1);
}

#[test]
fn test_clear_without_views_fails() {
    let mut s = scene();
    s.swapchain.destroy_swapchain_resources();
    let mut frame = FrameRenderer::new();
    frame.begin_frame();

    let result = frame.clear(s.context.as_mut(), &s.swapchain);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(frame.phase(), FramePhase::Idle);
}
