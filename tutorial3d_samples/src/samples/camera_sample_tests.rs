use super::*;
use glam::Vec2;

fn test_camera() -> PerspectiveCamera {
    let mut camera = PerspectiveCamera::new(FOV_DEGREES, 1280, 720, NEAR_PLANE, FAR_PLANE);
    camera.set_position(Vec3::ZERO);
    camera.set_direction(Vec3::Z);
    camera
}

// ============================================================================
// Keyboard movement
// ============================================================================

#[test]
fn test_w_moves_forward_and_s_moves_back() {
    let mut camera = test_camera();
    let mut input = InputState::new();

    input.press_key(KeyCode::KeyW);
    apply_camera_input(&mut camera, &input, false);
    assert!((camera.position() - Vec3::new(0.0, 0.0, MOVE_SPEED)).length() < 1e-5);

    input.release_key(KeyCode::KeyW);
    input.press_key(KeyCode::KeyS);
    apply_camera_input(&mut camera, &input, false);
    assert!(camera.position().length() < 1e-5);
}

#[test]
fn test_a_and_d_strafe() {
    let mut camera = test_camera();
    let mut input = InputState::new();

    input.press_key(KeyCode::KeyD);
    apply_camera_input(&mut camera, &input, false);
    assert!(camera.position().x > 0.0);

    input.release_key(KeyCode::KeyD);
    input.press_key(KeyCode::KeyA);
    apply_camera_input(&mut camera, &input, false);
    apply_camera_input(&mut camera, &input, false);
    assert!(camera.position().x < 0.0);
}

#[test]
fn test_no_input_leaves_camera_alone() {
    let mut camera = test_camera();
    let input = InputState::new();
    apply_camera_input(&mut camera, &input, false);
    assert_eq!(camera.position(), Vec3::ZERO);
    assert_eq!(camera.yaw(), 0.0);
}

// ============================================================================
// Mouse look
// ============================================================================

fn dragged_input(delta: Vec2) -> InputState {
    let mut input = InputState::new();
    input.move_cursor(100.0, 100.0);
    input.end_frame();
    input.press_button(MouseButton::Left);
    input.move_cursor(100.0 + delta.x, 100.0 + delta.y);
    input
}

#[test]
fn test_left_drag_turns_camera() {
    let mut camera = test_camera();
    let input = dragged_input(Vec2::new(50.0, -20.0));
    apply_camera_input(&mut camera, &input, false);

    assert!((camera.yaw() - 50.0 * LOOK_SENSITIVITY).abs() < 1e-4);
    // Dragging up looks up
    assert!((camera.pitch() - 20.0 * LOOK_SENSITIVITY).abs() < 1e-4);
}

#[test]
fn test_drag_ignored_while_overlay_has_mouse() {
    let mut camera = test_camera();
    let input = dragged_input(Vec2::new(50.0, 50.0));
    apply_camera_input(&mut camera, &input, true);

    assert_eq!(camera.yaw(), 0.0);
    assert_eq!(camera.pitch(), 0.0);
}

#[test]
fn test_cursor_motion_without_button_does_not_turn() {
    let mut camera = test_camera();
    let mut input = InputState::new();
    input.move_cursor(10.0, 10.0);
    input.move_cursor(60.0, 10.0);
    apply_camera_input(&mut camera, &input, false);
    assert_eq!(camera.yaw(), 0.0);
}

// ============================================================================
// Sample lifecycle
// ============================================================================

#[test]
fn test_new_camera_sample_faces_origin() {
    let sample = CameraSample::new(SampleArgs::default());
    let to_origin = (-START_POSITION).normalize();
    assert!((sample.camera.direction() - to_origin).length() < 1e-4);
    assert_eq!(sample.overlay_state, OverlayState::default());
}

#[test]
fn test_escape_requests_exit() {
    let mut sample = CameraSample::new(SampleArgs::default());
    let mut input = InputState::new();
    input.press_key(KeyCode::Escape);

    let mut context = UpdateContext::new(&input, 0.016, 0);
    sample.update(&mut context);
    assert!(context.exit_requested());
}

#[test]
fn test_render_before_initialize_fails() {
    let mut sample = CameraSample::new(SampleArgs::default());
    assert!(sample.render().is_err());
}
