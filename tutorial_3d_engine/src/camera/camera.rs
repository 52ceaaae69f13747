/// Perspective fly camera (left-handed, +Z forward, +Y up)
///
/// Orientation is stored as yaw/pitch in degrees; `direction` is derived
/// from them. Matrices are only recomputed by [`PerspectiveCamera::update`].

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::swapchain_manager::ResizeListener;

/// Pitch stays strictly inside +-90 so the view basis never degenerates
const MAX_PITCH_DEGREES: f32 = 89.0;

/// Per-frame camera constants (constant buffer slot 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraConstants {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl Default for CameraConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    fov_degrees: f32,
    width: f32,
    height: f32,
    near: f32,
    far: f32,
    position: Vec3,
    up: Vec3,
    yaw_degrees: f32,
    pitch_degrees: f32,
    constants: CameraConstants,
}

impl PerspectiveCamera {
    /// Camera at the origin looking down +Z
    pub fn new(fov_degrees: f32, width: u32, height: u32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            near,
            far,
            position: Vec3::ZERO,
            up: Vec3::Y,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            constants: CameraConstants::default(),
        };
        camera.update();
        camera
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction
    pub fn direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw_degrees.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch_degrees.to_radians().sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch)
    }

    /// Unit vector to the right of the view direction
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.direction()).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw_degrees
    }

    pub fn pitch(&self) -> f32 {
        self.pitch_degrees
    }

    pub fn fov(&self) -> f32 {
        self.fov_degrees
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    /// Constants computed by the last [`update`](Self::update)
    pub fn constants(&self) -> &CameraConstants {
        &self.constants
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Point the camera along `direction` (need not be normalized)
    pub fn set_direction(&mut self, direction: Vec3) {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        self.yaw_degrees = direction.x.atan2(direction.z).to_degrees();
        self.pitch_degrees = direction
            .y
            .asin()
            .to_degrees()
            .clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
    }

    // ===== MOVEMENT =====

    /// Move along the view direction (negative = backwards)
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.direction() * distance;
    }

    /// Strafe along the right vector (negative = left)
    pub fn slide(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }

    pub fn add_yaw(&mut self, degrees: f32) {
        self.yaw_degrees = (self.yaw_degrees + degrees) % 360.0;
    }

    pub fn add_pitch(&mut self, degrees: f32) {
        self.pitch_degrees = (self.pitch_degrees + degrees).clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
    }

    /// Change the aspect ratio; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width as f32;
        self.height = height as f32;
    }

    /// Recompute view and projection
    pub fn update(&mut self) -> &CameraConstants {
        let view = Mat4::look_to_lh(self.position, self.direction(), self.up);
        let projection = Mat4::perspective_lh(
            self.fov_degrees.to_radians(),
            self.aspect_ratio(),
            self.near,
            self.far,
        );
        self.constants = CameraConstants {
            view,
            projection,
            view_projection: projection * view,
        };
        &self.constants
    }
}

impl ResizeListener for PerspectiveCamera {
    fn on_swapchain_resized(&mut self, width: u32, height: u32) {
        self.resize(width, height);
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
