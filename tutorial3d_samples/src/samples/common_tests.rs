use super::*;
use glam::Vec3;

// ============================================================================
// Rotation
// ============================================================================

#[test]
fn test_rotation_step_is_quarter_turn_per_minute_of_frames() {
    // 6000 frames at 10ms per frame sweep 90 degrees
    let total = ROTATION_STEP_DEGREES * 6000.0;
    assert!((total - 90.0).abs() < 1e-3);
}

#[test]
fn test_advance_rotation_forward_and_backward() {
    let forward = advance_rotation(10.0, true);
    assert!((forward - (10.0 + ROTATION_STEP_DEGREES)).abs() < 1e-6);

    let backward = advance_rotation(10.0, false);
    assert!((backward - (10.0 - ROTATION_STEP_DEGREES)).abs() < 1e-6);
}

#[test]
fn test_advance_rotation_wraps() {
    let wrapped = advance_rotation(0.0, false);
    assert!(wrapped > 359.0 && wrapped < 360.0);

    let wrapped = advance_rotation(360.0 - ROTATION_STEP_DEGREES / 2.0, true);
    assert!(wrapped < 1.0);
}

// ============================================================================
// Object constants
// ============================================================================

#[test]
fn test_object_constants_layout() {
    assert_eq!(std::mem::size_of::<ObjectConstants>(), 64);
    let constants = ObjectConstants::rotation_y(0.0);
    assert_eq!(bytemuck::bytes_of(&constants).len(), 64);
    assert_eq!(constants.world, Mat4::IDENTITY);
}

#[test]
fn test_rotation_y_turns_x_axis_towards_negative_z() {
    let constants = ObjectConstants::rotation_y(90.0);
    let rotated = constants.world.transform_vector3(Vec3::X);
    assert!((rotated - Vec3::NEG_Z).length() < 1e-5);
}

// ============================================================================
// Assets and errors
// ============================================================================

#[test]
fn test_asset_root_holds_sample_shaders() {
    let shaders = asset_root().join("shaders");
    for name in ["color.vs.wgsl", "color.fs.wgsl", "textured.vs.wgsl", "textured.fs.wgsl"] {
        assert!(shaders.join(name).is_file(), "missing shader {}", name);
    }
}

#[test]
fn test_not_loaded_is_frame_state_error() {
    let err = not_loaded("render");
    assert!(matches!(err, Error::InvalidFrameState(ref msg) if msg.contains("render")));
}

#[test]
fn test_resize_without_resources_is_ignored() {
    let mut resources: Option<DeviceResources> = None;
    resize(&mut resources, 800, 600, &mut []);
    assert!(resources.is_none());
}
