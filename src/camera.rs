use glam::{Mat4, Vec3};

use crate::params::{Light, ShadowSettings};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Height of the view volume in world units.
    Orthographic { height: f32 },
}

/// A look-at camera producing right-handed view and projection matrices
/// with wgpu's 0..1 depth range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    /// Width over height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::Perspective {
                fov_y: 60f32.to_radians(),
            },
            aspect: 1080.0 / 720.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.projection = Projection::Perspective {
            fov_y: fov_degrees.to_radians(),
        };
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Orthographic camera looking at the origin along the light direction,
    /// `distance` units away.
    pub fn for_light(light: &Light, shadow: &ShadowSettings) -> Self {
        let to_light = light.to_light();
        // A light straight up or down is parallel to Y; pick another up.
        let up = if to_light.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        // The eye must not coincide with the origin it looks at.
        let distance = shadow.distance.max(0.5);
        Self {
            position: to_light * distance,
            target: Vec3::ZERO,
            up,
            projection: Projection::Orthographic {
                height: shadow.ortho_height,
            },
            aspect: 1.0,
            near: 0.1,
            far: distance * 2.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh(fov_y, self.aspect, self.near, self.far)
            }
            Projection::Orthographic { height } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn target_projects_to_screen_center() {
        let camera = Camera::default();
        let clip = camera.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn light_camera_sits_against_the_light_direction() {
        let light = Light::default();
        let shadow = ShadowSettings::default();
        let camera = Camera::for_light(&light, &shadow);
        assert!((camera.position.length() - shadow.distance).abs() < 1e-4);
        assert!(camera.forward().abs_diff_eq(light.direction.normalize(), 1e-5));
        assert!(matches!(camera.projection, Projection::Orthographic { height } if height == 3.0));
    }

    #[test]
    fn vertical_light_still_has_a_valid_view() {
        let light = Light {
            direction: Vec3::NEG_Y,
            ..Default::default()
        };
        let camera = Camera::for_light(&light, &ShadowSettings::default());
        assert!(camera.view().is_finite());
    }
}
