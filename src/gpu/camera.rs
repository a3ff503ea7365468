//! Camera looking down the z axis at the point field.

use glam::{Mat4, Vec3};

/// Vertical field of view in degrees.
pub const FOV_DEGREES: f32 = 45.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

/// Perspective camera on the z axis that eases towards a target distance.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Current distance from the origin.
    pub z: f32,
    /// Distance the camera drifts towards.
    pub target_z: f32,
    /// Fraction of the remaining distance covered per frame.
    pub easing: f32,
}

impl Camera {
    pub fn new(distance: f32, easing: f32) -> Self {
        Self {
            z: distance,
            target_z: distance,
            easing,
        }
    }

    /// Move one frame towards the target.
    pub fn drift(&mut self) {
        self.z += (self.target_z - self.z) * self.easing;
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_DEGREES.to_radians(), aspect, NEAR, FAR)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Visible `(width, height)` of the `z = 0` plane at the current distance.
    pub fn world_size(&self, aspect: f32) -> (f32, f32) {
        let height = 2.0 * (FOV_DEGREES.to_radians() / 2.0).tan() * self.z;
        (height * aspect, height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(crate::config::CAMERA_DISTANCE, crate::config::CAMERA_EASING)
    }
}
