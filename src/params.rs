//! Per-frame parameters.
//!
//! Everything a pass needs besides geometry lives in [`FrameParams`], built by
//! the caller each frame and handed to the renderer by reference. The setters
//! the demo's input handling uses go through the `clamped` helpers, which keep
//! values inside the ranges the interactive controls allow.

use glam::Vec3;

use crate::camera::Camera;

/// Phong material coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Ambient reflectance.
    pub ka: f32,
    /// Diffuse reflectance.
    pub kd: f32,
    /// Specular reflectance.
    pub ks: f32,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ka: 1.0,
            kd: 0.5,
            ks: 0.5,
            shininess: 128.0,
        }
    }
}

impl Material {
    pub fn clamped(self) -> Self {
        Self {
            ka: self.ka.clamp(0.0, 1.0),
            kd: self.kd.clamp(0.0, 1.0),
            ks: self.ks.clamp(0.0, 1.0),
            shininess: self.shininess.clamp(2.0, 1024.0),
        }
    }
}

/// A directional light plus the scene's ambient term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Direction the light travels in (from the light toward the scene).
    pub direction: Vec3,
    pub color: Vec3,
    pub ambient: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5),
            color: Vec3::ONE,
            ambient: Vec3::new(0.3, 0.4, 0.46),
        }
    }
}

impl Light {
    /// Unit vector pointing from a surface toward the light.
    pub fn to_light(&self) -> Vec3 {
        (-self.direction).normalize_or(Vec3::Y)
    }
}

/// Placement of the orthographic shadow camera and the depth bias range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    /// Distance of the shadow camera from the scene origin along the light.
    pub distance: f32,
    /// Height of the orthographic view volume.
    pub ortho_height: f32,
    pub min_bias: f32,
    pub max_bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            distance: 10.0,
            ortho_height: 3.0,
            min_bias: 0.005,
            max_bias: 0.015,
        }
    }
}

impl ShadowSettings {
    pub fn clamped(self) -> Self {
        Self {
            distance: self.distance.clamp(0.0, 50.0),
            ortho_height: self.ortho_height.clamp(0.1, 50.0),
            min_bias: self.min_bias.clamp(0.0, 0.05),
            max_bias: self.max_bias.clamp(0.0, 0.5),
        }
    }

    /// Slope-scaled bias: grows as the surface turns away from the light.
    pub fn bias(&self, n_dot_l: f32) -> f32 {
        (self.max_bias * (1.0 - n_dot_l)).max(self.min_bias)
    }
}

/// Full-screen effect applied by the post-process pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PostEffect {
    /// Copies the input unchanged.
    #[default]
    None,
    Invert,
    BoxBlur,
}

impl PostEffect {
    pub const ALL: [PostEffect; 3] = [PostEffect::None, PostEffect::Invert, PostEffect::BoxBlur];

    pub fn name(self) -> &'static str {
        match self {
            PostEffect::None => "none",
            PostEffect::Invert => "invert",
            PostEffect::BoxBlur => "box blur",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostSettings {
    pub effect: PostEffect,
    /// Box blur half-width in texels; the kernel covers `(2r + 1)²` texels.
    pub radius: u32,
}

impl PostSettings {
    pub const MAX_RADIUS: u32 = 25;

    pub fn clamped(self) -> Self {
        Self {
            effect: self.effect,
            radius: self.radius.min(Self::MAX_RADIUS),
        }
    }
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            effect: PostEffect::None,
            radius: 2,
        }
    }
}

/// All inputs for one frame besides the draw list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameParams {
    pub camera: Camera,
    pub material: Material,
    pub light: Light,
    pub shadow: ShadowSettings,
    pub post: PostSettings,
    /// Elapsed seconds.
    pub time: f32,
}

impl FrameParams {
    /// The orthographic camera the shadow pass renders from.
    pub fn light_camera(&self) -> Camera {
        Camera::for_light(&self.light, &self.shadow.clamped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_interactive_controls() {
        let shadow = ShadowSettings::default();
        assert_eq!(shadow.distance, 10.0);
        assert_eq!(shadow.ortho_height, 3.0);
        assert_eq!(PostSettings::default().radius, 2);
        assert_eq!(Material::default().shininess, 128.0);
    }

    #[test]
    fn clamping_keeps_values_in_range() {
        let material = Material {
            ka: -1.0,
            kd: 2.0,
            ks: 0.25,
            shininess: 0.0,
        }
        .clamped();
        assert_eq!(
            material,
            Material {
                ka: 0.0,
                kd: 1.0,
                ks: 0.25,
                shininess: 2.0
            }
        );

        let post = PostSettings {
            effect: PostEffect::BoxBlur,
            radius: 400,
        }
        .clamped();
        assert_eq!(post.radius, PostSettings::MAX_RADIUS);

        let shadow = ShadowSettings {
            max_bias: 3.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(shadow.max_bias, 0.5);
    }

    #[test]
    fn flat_shadow_volume_still_projects() {
        let params = FrameParams {
            shadow: ShadowSettings {
                ortho_height: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(params.shadow.clamped().ortho_height, 0.1);
        assert!(params.light_camera().view_projection().is_finite());
    }

    #[test]
    fn bias_never_drops_below_minimum() {
        let shadow = ShadowSettings::default();
        assert_eq!(shadow.bias(1.0), shadow.min_bias);
        assert!((shadow.bias(0.0) - shadow.max_bias).abs() < 1e-6);
    }

    #[test]
    fn to_light_points_against_direction() {
        let light = Light {
            direction: Vec3::new(0.0, -2.0, 0.0),
            ..Default::default()
        };
        assert!(light.to_light().abs_diff_eq(Vec3::Y, 1e-6));
    }
}
