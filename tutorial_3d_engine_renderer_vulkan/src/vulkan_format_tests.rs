//! Unit tests for Vulkan conversion and selection functions
//!
//! Everything here is pure: no instance, device or window is created.

use ash::vk;
use tutorial_3d_engine::tutorial3d::log::LogSeverity;
use tutorial_3d_engine::tutorial3d::Error;
use tutorial_3d_engine::tutorial3d::render::{
    AddressMode, BufferUsage, CompareOp, CullMode, FillMode, Filter, IndexType, OverlayVertex,
    PrimitiveTopology, TextureFormat, VertexFormat, VertexLayoutKind,
};

use super::{choose_depth_stencil_format, debug_reports_enabled};
use crate::debug::{message_severity_to_log, message_type_label};
use crate::vulkan_buffer::buffer_usage_to_vk;
use crate::vulkan_device_context::index_type_to_vk;
use crate::vulkan_frame::{frame_error, layout_access};
use crate::vulkan_overlay::overlay_vertex_attributes;
use crate::vulkan_pipeline::{topology_to_vk, vertex_attributes_to_vk, vertex_format_to_vk};
use crate::vulkan_render_state::{compare_op_to_vk, cull_mode_to_vk, front_face_to_vk, polygon_mode_to_vk};
use crate::vulkan_sampler::{address_mode_to_vk, filter_to_vk, mipmap_mode_to_vk};
use crate::vulkan_swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, RebuildFailure,
    ResizeRecovery,
};
use crate::vulkan_texture::{depth_aspect, texture_format_to_vk, vk_format_to_format};

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

fn capabilities(current: (u32, u32), min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D { width: current.0, height: current.1 },
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
        min_image_count: min_images,
        max_image_count: max_images,
        ..Default::default()
    }
}

// ============================================================================
// TEXTURE FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    let ds = vk::Format::D24_UNORM_S8_UINT;
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_SRGB, ds), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM, ds), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB, ds), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_UNORM, ds), vk::Format::B8G8R8A8_UNORM);
}

#[test]
fn test_texture_format_to_vk_depth_uses_device_format() {
    assert_eq!(
        texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT, vk::Format::D32_SFLOAT_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT
    );
    assert_eq!(
        texture_format_to_vk(TextureFormat::D32_FLOAT, vk::Format::D32_SFLOAT_S8_UINT),
        vk::Format::D32_SFLOAT
    );
}

#[test]
fn test_vk_format_to_format_known_and_unknown() {
    assert_eq!(vk_format_to_format(vk::Format::B8G8R8A8_SRGB), Some(TextureFormat::B8G8R8A8_SRGB));
    assert_eq!(
        vk_format_to_format(vk::Format::D32_SFLOAT_S8_UINT),
        Some(TextureFormat::D24_UNORM_S8_UINT)
    );
    assert_eq!(vk_format_to_format(vk::Format::R16G16B16A16_SFLOAT), None);
}

#[test]
fn test_depth_aspect_includes_stencil_only_when_present() {
    assert_eq!(depth_aspect(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        depth_aspect(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_choose_depth_stencil_format_prefers_d24() {
    assert_eq!(choose_depth_stencil_format(|_| true), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_choose_depth_stencil_format_falls_back_to_d32s8() {
    let format = choose_depth_stencil_format(|format| format == vk::Format::D32_SFLOAT_S8_UINT);
    assert_eq!(format, vk::Format::D32_SFLOAT_S8_UINT);
    assert_eq!(choose_depth_stencil_format(|_| false), vk::Format::D32_SFLOAT_S8_UINT);
}

// ============================================================================
// RENDER STATE CONVERSION TESTS
// ============================================================================

#[test]
fn test_compare_op_to_vk_all_variants() {
    let cases = [
        (CompareOp::Never, vk::CompareOp::NEVER),
        (CompareOp::Less, vk::CompareOp::LESS),
        (CompareOp::Equal, vk::CompareOp::EQUAL),
        (CompareOp::LessOrEqual, vk::CompareOp::LESS_OR_EQUAL),
        (CompareOp::Greater, vk::CompareOp::GREATER),
        (CompareOp::NotEqual, vk::CompareOp::NOT_EQUAL),
        (CompareOp::GreaterOrEqual, vk::CompareOp::GREATER_OR_EQUAL),
        (CompareOp::Always, vk::CompareOp::ALWAYS),
    ];
    for (op, expected) in cases {
        assert_eq!(compare_op_to_vk(op), expected, "{:?}", op);
    }
}

#[test]
fn test_cull_mode_to_vk() {
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(cull_mode_to_vk(CullMode::Front), vk::CullModeFlags::FRONT);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
}

#[test]
fn test_front_face_to_vk() {
    assert_eq!(front_face_to_vk(false), vk::FrontFace::CLOCKWISE);
    assert_eq!(front_face_to_vk(true), vk::FrontFace::COUNTER_CLOCKWISE);
}

#[test]
fn test_polygon_mode_to_vk() {
    assert_eq!(polygon_mode_to_vk(FillMode::Solid), vk::PolygonMode::FILL);
    assert_eq!(polygon_mode_to_vk(FillMode::Wireframe), vk::PolygonMode::LINE);
}

// ============================================================================
// PIPELINE INPUT CONVERSION TESTS
// ============================================================================

#[test]
fn test_topology_to_vk() {
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleStrip), vk::PrimitiveTopology::TRIANGLE_STRIP);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineList), vk::PrimitiveTopology::LINE_LIST);
}

#[test]
fn test_vertex_format_to_vk() {
    assert_eq!(vertex_format_to_vk(VertexFormat::Float32x2), vk::Format::R32G32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float32x3), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float32x4), vk::Format::R32G32B32A32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Unorm8x4), vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_vertex_attributes_follow_layout() {
    for layout in [VertexLayoutKind::PositionColor, VertexLayoutKind::PositionColorUv] {
        let attributes = vertex_attributes_to_vk(layout);
        assert_eq!(attributes.len(), layout.attributes().len());
        for (vk_attribute, attribute) in attributes.iter().zip(layout.attributes()) {
            assert_eq!(vk_attribute.binding, 0);
            assert_eq!(vk_attribute.location, attribute.location);
            assert_eq!(vk_attribute.offset, attribute.offset);
            assert_eq!(vk_attribute.format, vertex_format_to_vk(attribute.format));
            assert!(vk_attribute.offset < layout.stride());
        }
    }
}

#[test]
fn test_overlay_vertex_attributes_fit_vertex_size() {
    let attributes = overlay_vertex_attributes();
    let stride = std::mem::size_of::<OverlayVertex>() as u32;

    assert_eq!(attributes.len(), 3);
    assert_eq!(stride, 20);
    assert_eq!(attributes[2].format, vk::Format::R8G8B8A8_UNORM);
    assert_eq!(attributes[2].offset + 4, stride);
}

#[test]
fn test_buffer_usage_to_vk() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Vertex), vk::BufferUsageFlags::VERTEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Constant), vk::BufferUsageFlags::UNIFORM_BUFFER);
}

#[test]
fn test_index_type_to_vk() {
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

// ============================================================================
// SAMPLER CONVERSION TESTS
// ============================================================================

#[test]
fn test_sampler_filters_to_vk() {
    assert_eq!(filter_to_vk(Filter::Nearest), vk::Filter::NEAREST);
    assert_eq!(filter_to_vk(Filter::Linear), vk::Filter::LINEAR);
    assert_eq!(mipmap_mode_to_vk(Filter::Nearest), vk::SamplerMipmapMode::NEAREST);
    assert_eq!(mipmap_mode_to_vk(Filter::Linear), vk::SamplerMipmapMode::LINEAR);
}

#[test]
fn test_address_mode_to_vk() {
    assert_eq!(address_mode_to_vk(AddressMode::Repeat), vk::SamplerAddressMode::REPEAT);
    assert_eq!(address_mode_to_vk(AddressMode::MirroredRepeat), vk::SamplerAddressMode::MIRRORED_REPEAT);
    assert_eq!(address_mode_to_vk(AddressMode::ClampToEdge), vk::SamplerAddressMode::CLAMP_TO_EDGE);
}

// ============================================================================
// IMAGE LAYOUT TESTS
// ============================================================================

#[test]
fn test_layout_access_attachments() {
    let (access, stage) = layout_access(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert!(access.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
    assert_eq!(stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);

    let (access, stage) = layout_access(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    assert!(access.contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
    assert!(stage.contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
}

#[test]
fn test_layout_access_undefined_and_present() {
    assert_eq!(
        layout_access(vk::ImageLayout::UNDEFINED),
        (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE)
    );
    assert_eq!(
        layout_access(vk::ImageLayout::PRESENT_SRC_KHR),
        (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE)
    );
}

// ============================================================================
// SWAPCHAIN SELECTION TESTS
// ============================================================================

#[test]
fn test_choose_surface_format_prefers_requested() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_UNORM),
        surface_format(vk::Format::R8G8B8A8_UNORM),
    ];
    let chosen = choose_surface_format(&formats, vk::Format::R8G8B8A8_UNORM).unwrap();
    assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_choose_surface_format_falls_back_to_known_format() {
    let formats = [
        surface_format(vk::Format::A2B10G10R10_UNORM_PACK32),
        surface_format(vk::Format::B8G8R8A8_SRGB),
    ];
    let chosen = choose_surface_format(&formats, vk::Format::R8G8B8A8_UNORM).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);

    let only_unknown = [surface_format(vk::Format::A2B10G10R10_UNORM_PACK32)];
    let chosen = choose_surface_format(&only_unknown, vk::Format::R8G8B8A8_UNORM).unwrap();
    assert_eq!(chosen.format, vk::Format::A2B10G10R10_UNORM_PACK32);

    assert!(choose_surface_format(&[], vk::Format::R8G8B8A8_UNORM).is_none());
}

#[test]
fn test_choose_present_mode() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
    assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
    assert_eq!(
        choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE], false),
        vk::PresentModeKHR::IMMEDIATE
    );
    assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], false), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_choose_extent_fixed_by_window_system() {
    let caps = capabilities((800, 600), 2, 3);
    assert_eq!(choose_extent(&caps, 1024, 768), vk::Extent2D { width: 800, height: 600 });
}

#[test]
fn test_choose_extent_clamps_requested_size() {
    let caps = capabilities((u32::MAX, u32::MAX), 2, 3);
    assert_eq!(choose_extent(&caps, 1024, 768), vk::Extent2D { width: 1024, height: 768 });
    assert_eq!(choose_extent(&caps, 8000, 0), vk::Extent2D { width: 4096, height: 1 });
}

#[test]
fn test_choose_image_count() {
    assert_eq!(choose_image_count(&capabilities((1, 1), 2, 3), 2), 2);
    assert_eq!(choose_image_count(&capabilities((1, 1), 3, 8), 2), 3);
    assert_eq!(choose_image_count(&capabilities((1, 1), 2, 3), 5), 3);
    // 0 = no upper limit
    assert_eq!(choose_image_count(&capabilities((1, 1), 2, 0), 5), 5);
}

// ============================================================================
// RESIZE RECOVERY TESTS
// ============================================================================

#[test]
fn test_failure_before_create_keeps_previous_swapchain() {
    assert_eq!(
        ResizeRecovery::after(true, RebuildFailure::BeforeCreate),
        ResizeRecovery::KeepPrevious
    );
}

#[test]
fn test_failure_after_create_rebuilds_at_previous_size() {
    // The old swapchain is retired by the create call and can no longer acquire
    assert_eq!(
        ResizeRecovery::after(true, RebuildFailure::AfterCreate),
        ResizeRecovery::RebuildAtPreviousSize
    );
}

#[test]
fn test_failure_without_previous_leaves_no_swapchain() {
    assert_eq!(ResizeRecovery::after(false, RebuildFailure::BeforeCreate), ResizeRecovery::NoSwapchain);
    assert_eq!(ResizeRecovery::after(false, RebuildFailure::AfterCreate), ResizeRecovery::NoSwapchain);
}

#[test]
fn test_frame_error_keeps_device_loss_distinct() {
    assert_eq!(frame_error(vk::Result::ERROR_DEVICE_LOST, "submit frame"), Error::DeviceLost);
    assert!(matches!(
        frame_error(vk::Result::ERROR_OUT_OF_HOST_MEMORY, "submit frame"),
        Error::BackendError(ref msg) if msg.contains("submit frame")
    ));
}

// ============================================================================
// VALIDATION MESSAGE TESTS
// ============================================================================

#[test]
fn test_message_severity_to_log() {
    use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;

    assert_eq!(message_severity_to_log(Severity::ERROR), LogSeverity::Error);
    assert_eq!(message_severity_to_log(Severity::WARNING), LogSeverity::Warn);
    assert_eq!(message_severity_to_log(Severity::INFO), LogSeverity::Info);
    assert_eq!(message_severity_to_log(Severity::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_message_type_label() {
    use vk::DebugUtilsMessageTypeFlagsEXT as Type;

    assert_eq!(message_type_label(Type::VALIDATION), "Validation");
    assert_eq!(message_type_label(Type::PERFORMANCE), "Performance");
    assert_eq!(message_type_label(Type::GENERAL), "General");
    assert_eq!(message_type_label(Type::VALIDATION | Type::PERFORMANCE), "Validation");
}

#[test]
fn test_shutdown_reports_follow_build_and_validation() {
    assert!(!debug_reports_enabled(false));
    assert_eq!(debug_reports_enabled(true), cfg!(debug_assertions));
}
