//! Local rigid poses.
//!
//! [`Transform`] stores translation, rotation and scale separately so joints can
//! be animated component-wise, and bakes them into a matrix only when needed.
//!
//! ```
//! use rigpass::{Transform, Vec3, Quat};
//!
//! let elbow = Transform::new()
//!     .position(Vec3::new(-1.2, -0.5, 0.0))
//!     .rotation(Quat::from_rotation_z(0.3))
//!     .uniform_scale(0.2);
//! let local = elbow.matrix();
//! ```

use glam::{Mat4, Quat, Vec3};

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Offset from the parent's origin.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation. Non-unit quaternions are normalized so the result
    /// stays a rigid rotation.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Bakes the pose into a matrix, applying scale, then rotation, then
    /// translation (`T * R * S`).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::new().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn scale_rotate_translate_order() {
        let t = Transform::new()
            .position(Vec3::new(1.0, 2.0, 3.0))
            .rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .uniform_scale(2.0);

        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(t.matrix().abs_diff_eq(expected, 1e-5));

        // +X scaled to 2, rotated onto +Y, then offset
        let p = t.matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 4.0, 3.0), 1e-5));
    }

    #[test]
    fn rotation_is_normalized() {
        let t = Transform::new().rotation(Quat::from_xyzw(0.0, -0.7, 0.0, 1.0));
        assert!((t.rotation.length() - 1.0).abs() < 1e-6);
    }
}
