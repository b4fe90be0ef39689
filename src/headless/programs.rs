//! CPU versions of the pass programs. They mirror the WGSL shaders in
//! `src/shaders/` closely enough that pixel properties checked here hold for
//! the GPU path too.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::GraphError;
use crate::params::{FrameParams, Light, Material, ShadowSettings};
use crate::render_graph::{Attachment, CullMode, PassIo, config::gbuffer};
use crate::scene::HeadlessDraw;

use super::raster::{Fragment, rasterize};
use super::{DepthImage, Image, ImageTarget, effects};

/// Everything the programs read besides their bound textures.
pub(super) struct FrameInputs<'a, 'd> {
    pub params: &'a FrameParams,
    pub draws: &'a [HeadlessDraw<'d>],
    pub clear_color: [f32; 4],
}

/// Interpolated world-space surface attributes at a fragment.
struct Surface {
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
}

fn raster_draw(
    draw: &HeadlessDraw<'_>,
    view_proj: Mat4,
    target: &ImageTarget,
    cull: CullMode,
    mut shade: impl FnMut(&Fragment, Surface),
) {
    use crate::target::TargetInfo;

    let extent = target.extent();
    let normal_matrix = Mat3::from_mat4(draw.model).inverse().transpose();
    for tri in draw.mesh.triangles() {
        let world = tri.map(|v| draw.model.transform_point3(Vec3::from(v.position)));
        let normals = tri.map(|v| normal_matrix * Vec3::from(v.normal));
        let uvs = tri.map(|v| Vec2::from(v.uv));
        let clip = world.map(|p| view_proj * p.extend(1.0));
        rasterize(clip, extent, cull, |frag| {
            let surface = Surface {
                position: frag.interpolate(world),
                normal: frag.interpolate(normals).normalize_or_zero(),
                uv: frag.interpolate2(uvs),
            };
            shade(&frag, surface);
        });
    }
}

fn albedo(draw: &HeadlessDraw<'_>, uv: Vec2) -> Vec4 {
    // An empty texture counts as no texture.
    let texel = draw
        .texture
        .filter(|tex| !tex.extent().is_empty())
        .map_or(Vec4::ONE, |tex| Vec4::from(tex.sample_repeat(uv.x, uv.y)));
    draw.tint * texel
}

/// Blinn-Phong with a single directional light; `shadow` is 1 in full shadow.
pub fn blinn_phong(
    material: &Material,
    light: &Light,
    normal: Vec3,
    to_eye: Vec3,
    shadow: f32,
) -> Vec3 {
    let l = light.to_light();
    let n_dot_l = normal.dot(l).max(0.0);
    let half = (l + to_eye).normalize_or_zero();
    let spec = if n_dot_l > 0.0 {
        normal.dot(half).max(0.0).powf(material.shininess)
    } else {
        0.0
    };
    (material.kd * n_dot_l + material.ks * spec) * light.color * (1.0 - shadow)
        + light.ambient * material.ka
}

/// 1 if `position` is behind the occluder stored in the shadow map.
pub fn shadow_factor(
    position: Vec3,
    normal: Vec3,
    light: &Light,
    settings: &ShadowSettings,
    light_view_proj: Mat4,
    shadow_map: &DepthImage,
) -> f32 {
    let clip = light_view_proj * position.extend(1.0);
    if clip.w <= 0.0 {
        return 0.0;
    }
    let ndc = clip.truncate() / clip.w;
    let uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if uv.min_element() < 0.0 || uv.max_element() > 1.0 || ndc.z > 1.0 {
        return 0.0;
    }

    let extent = shadow_map.extent();
    let x = ((uv.x * extent.width as f32) as u32).min(extent.width - 1);
    let y = ((uv.y * extent.height as f32) as u32).min(extent.height - 1);
    let bias = settings.bias(normal.dot(light.to_light()).max(0.0));
    if ndc.z - bias > shadow_map.get(x, y) {
        1.0
    } else {
        0.0
    }
}

pub(super) fn forward(
    frame: &FrameInputs<'_, '_>,
    cull: CullMode,
    target: &mut ImageTarget,
) -> Result<(), GraphError> {
    let params = frame.params;
    let view_proj = params.camera.view_projection();
    let material = params.material.clamped();
    target.clear(frame.clear_color);

    let mut fragments = Vec::new();
    for draw in frame.draws {
        raster_draw(draw, view_proj, target, cull, |frag, surface| {
            let to_eye = (params.camera.position - surface.position).normalize_or_zero();
            let lit = blinn_phong(&material, &params.light, surface.normal, to_eye, 0.0);
            let base = albedo(draw, surface.uv);
            fragments.push((*frag, (lit * base.truncate()).extend(1.0)));
        });
        for (frag, color) in fragments.drain(..) {
            if target.depth_mut()?.test_and_set(frag.x, frag.y, frag.depth) {
                target.store(0, frag.x, frag.y, color.to_array())?;
            }
        }
    }
    Ok(())
}

pub(super) fn geometry(
    frame: &FrameInputs<'_, '_>,
    cull: CullMode,
    target: &mut ImageTarget,
) -> Result<(), GraphError> {
    let view_proj = frame.params.camera.view_projection();
    // Alpha 0 in the albedo attachment marks background pixels.
    target.clear([0.0; 4]);

    let mut fragments = Vec::new();
    for draw in frame.draws {
        raster_draw(draw, view_proj, target, cull, |frag, surface| {
            let base = albedo(draw, surface.uv);
            fragments.push((*frag, surface, base));
        });
        for (frag, surface, base) in fragments.drain(..) {
            if target.depth_mut()?.test_and_set(frag.x, frag.y, frag.depth) {
                let (x, y) = (frag.x, frag.y);
                target.store(gbuffer::POSITION, x, y, surface.position.extend(1.0).to_array())?;
                target.store(gbuffer::NORMAL, x, y, surface.normal.extend(0.0).to_array())?;
                target.store(gbuffer::ALBEDO, x, y, base.truncate().extend(1.0).to_array())?;
            }
        }
    }
    Ok(())
}

pub(super) fn shadow(
    frame: &FrameInputs<'_, '_>,
    cull: CullMode,
    target: &mut ImageTarget,
) -> Result<(), GraphError> {
    let view_proj = frame.params.light_camera().view_projection();
    target.clear([0.0; 4]);

    let mut depths = Vec::new();
    for draw in frame.draws {
        raster_draw(draw, view_proj, target, cull, |frag, _| depths.push(*frag));
        let depth = target.depth_mut()?;
        for frag in depths.drain(..) {
            depth.test_and_set(frag.x, frag.y, frag.depth);
        }
    }
    Ok(())
}

pub(super) fn lighting(
    frame: &FrameInputs<'_, '_>,
    io: &mut PassIo<'_, ImageTarget>,
    display: &mut ImageTarget,
) -> Result<(), GraphError> {
    use crate::render_graph::config::lighting_units as unit;

    let position = color_input(io, unit::POSITION)?;
    let normal = color_input(io, unit::NORMAL)?;
    let albedo = color_input(io, unit::ALBEDO)?;
    let shadow_map = depth_input(io, unit::SHADOW)?;
    let target = output(io, display);

    let params = frame.params;
    let material = params.material.clamped();
    let shadow = params.shadow.clamped();
    let light_view_proj = params.light_camera().view_projection();
    let clear = frame.clear_color;

    let lit = Image::from_fn(albedo.width(), albedo.height(), |x, y| {
        let base = Vec4::from(albedo.get(x, y));
        if base.w == 0.0 {
            return clear;
        }
        let p = Vec4::from(position.get(x, y)).truncate();
        let n = Vec4::from(normal.get(x, y)).truncate().normalize_or_zero();
        let in_shadow = shadow_factor(p, n, &params.light, &shadow, light_view_proj, shadow_map);
        let to_eye = (params.camera.position - p).normalize_or_zero();
        let color = blinn_phong(&material, &params.light, n, to_eye, in_shadow) * base.truncate();
        color.extend(1.0).to_array()
    });
    target.store_image(0, &lit)?;
    Ok(())
}

pub(super) fn post_process(
    frame: &FrameInputs<'_, '_>,
    io: &mut PassIo<'_, ImageTarget>,
    display: &mut ImageTarget,
) -> Result<(), GraphError> {
    let input = color_input(io, 0)?;
    let target = output(io, display);
    let out = effects::apply(&frame.params.post.clamped(), input);
    target.store_image(0, &out)?;
    Ok(())
}

/// The pass's target, or the display when the pass writes the display.
pub(super) fn output<'t>(
    io: &'t mut PassIo<'_, ImageTarget>,
    display: &'t mut ImageTarget,
) -> &'t mut ImageTarget {
    io.output().unwrap_or(display)
}

fn color_input<'a>(io: &PassIo<'a, ImageTarget>, unit: u32) -> Result<&'a Image, GraphError> {
    let input = io.input(unit)?;
    let target: &'a ImageTarget = input.target;
    match input.attachment {
        Attachment::Color(index) => Ok(target.color(index)?),
        Attachment::Depth => Err(GraphError::MissingAttachment {
            pass: format!("texture unit {unit}"),
            target: format!("{:?}", input.id),
            attachment: "a color attachment".into(),
        }),
    }
}

fn depth_input<'a>(io: &PassIo<'a, ImageTarget>, unit: u32) -> Result<&'a DepthImage, GraphError> {
    let input = io.input(unit)?;
    let target: &'a ImageTarget = input.target;
    Ok(target.depth()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_light_is_brighter_than_facing_away() {
        let material = Material::default();
        let light = Light::default();
        let toward = light.to_light();
        let lit = blinn_phong(&material, &light, toward, toward, 0.0);
        let away = blinn_phong(&material, &light, -toward, toward, 0.0);
        assert!(lit.x > away.x);
        // Facing away leaves only the ambient term.
        assert!(away.abs_diff_eq(light.ambient * material.ka, 1e-6));
    }

    #[test]
    fn full_shadow_removes_direct_light() {
        let material = Material::default();
        let light = Light::default();
        let n = light.to_light();
        let shadowed = blinn_phong(&material, &light, n, n, 1.0);
        assert!(shadowed.abs_diff_eq(light.ambient * material.ka, 1e-6));
    }

    #[test]
    fn occluded_point_is_in_shadow() {
        let params = FrameParams::default();
        let light_vp = params.light_camera().view_projection();
        let n = params.light.to_light();

        // An occluder close to the light over the whole map.
        let mut map = DepthImage::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                map.test_and_set(x, y, 0.1);
            }
        }
        let origin = shadow_factor(Vec3::ZERO, n, &params.light, &params.shadow, light_vp, &map);
        assert_eq!(origin, 1.0);

        let clear = DepthImage::new(4, 4);
        let unoccluded =
            shadow_factor(Vec3::ZERO, n, &params.light, &params.shadow, light_vp, &clear);
        assert_eq!(unoccluded, 0.0);
    }
}
