//! Triangle rasterization in the same conventions as wgpu: NDC y up,
//! framebuffer row 0 at the top, depth in 0..1, counter-clockwise front
//! faces, pixel centers at half-integer coordinates.

use glam::{Vec2, Vec3, Vec4};

use crate::render_graph::CullMode;
use crate::target::Extent;

/// A covered pixel.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    /// Perspective-correct barycentric weights of the three vertices.
    pub bary: Vec3,
}

impl Fragment {
    pub fn interpolate(&self, values: [Vec3; 3]) -> Vec3 {
        values[0] * self.bary.x + values[1] * self.bary.y + values[2] * self.bary.z
    }

    pub fn interpolate2(&self, values: [Vec2; 3]) -> Vec2 {
        values[0] * self.bary.x + values[1] * self.bary.y + values[2] * self.bary.z
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Calls `fragment` for every pixel center the triangle covers.
///
/// Triangles with a vertex at or behind the eye (`w <= 0`) are dropped
/// rather than clipped. Fragments outside the 0..1 depth range are dropped.
pub fn rasterize(clip: [Vec4; 3], extent: Extent, cull: CullMode, mut fragment: impl FnMut(Fragment)) {
    if clip.iter().any(|c| c.w <= 0.0) || extent.is_empty() {
        return;
    }

    let ndc = clip.map(|c| c.truncate() / c.w);
    let ndc_area = edge(ndc[0].truncate(), ndc[1].truncate(), ndc[2].truncate());
    let visible = match cull {
        CullMode::None => ndc_area != 0.0,
        CullMode::Back => ndc_area > 0.0,
        CullMode::Front => ndc_area < 0.0,
    };
    if !visible {
        return;
    }

    let (w, h) = (extent.width as f32, extent.height as f32);
    let screen = ndc.map(|p| Vec2::new((p.x * 0.5 + 0.5) * w, (0.5 - p.y * 0.5) * h));
    let area = edge(screen[0], screen[1], screen[2]);
    if area == 0.0 {
        return;
    }

    let min = screen[0].min(screen[1]).min(screen[2]);
    let max = screen[0].max(screen[1]).max(screen[2]);
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil() as i64).clamp(0, extent.width as i64) as u32;
    let y1 = (max.y.ceil() as i64).clamp(0, extent.height as i64) as u32;

    let inv_w = Vec3::new(1.0 / clip[0].w, 1.0 / clip[1].w, 1.0 / clip[2].w);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let l = Vec3::new(
                edge(screen[1], screen[2], p),
                edge(screen[2], screen[0], p),
                edge(screen[0], screen[1], p),
            ) / area;
            if l.min_element() < 0.0 {
                continue;
            }

            let depth = l.dot(Vec3::new(ndc[0].z, ndc[1].z, ndc[2].z));
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            let persp = l * inv_w;
            let bary = persp / persp.element_sum();
            fragment(Fragment { x, y, depth, bary });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ccw() -> [Vec4; 3] {
        [
            Vec4::new(-0.5, -0.5, 0.5, 1.0),
            Vec4::new(0.5, -0.5, 0.5, 1.0),
            Vec4::new(0.0, 0.5, 0.5, 1.0),
        ]
    }

    fn coverage(clip: [Vec4; 3], cull: CullMode) -> Vec<(u32, u32)> {
        let mut hits = Vec::new();
        rasterize(clip, Extent::new(8, 8), cull, |f| hits.push((f.x, f.y)));
        hits
    }

    #[test]
    fn culling_follows_winding() {
        let front = ccw();
        let back = [front[0], front[2], front[1]];
        assert!(!coverage(front, CullMode::Back).is_empty());
        assert!(coverage(back, CullMode::Back).is_empty());
        assert!(coverage(front, CullMode::Front).is_empty());
        assert!(!coverage(back, CullMode::Front).is_empty());
        assert_eq!(
            coverage(front, CullMode::None).len(),
            coverage(back, CullMode::None).len()
        );
    }

    #[test]
    fn ndc_up_maps_to_upper_rows() {
        // Apex at NDC y = 0.5 lands in the upper half of the image.
        let hits = coverage(ccw(), CullMode::None);
        let top = hits.iter().map(|&(_, y)| y).min().unwrap();
        let bottom = hits.iter().map(|&(_, y)| y).max().unwrap();
        assert_eq!(top, 3);
        assert_eq!(bottom, 5);
    }

    #[test]
    fn weights_sum_to_one_and_depth_is_interpolated() {
        rasterize(ccw(), Extent::new(8, 8), CullMode::Back, |f| {
            assert!((f.bary.element_sum() - 1.0).abs() < 1e-5);
            assert!((f.depth - 0.5).abs() < 1e-6);
        });
    }

    #[test]
    fn farther_vertex_gets_less_weight() {
        // Scaling a clip position by 2 keeps its screen position but doubles w.
        let near = ccw();
        let mut far = ccw();
        far[2] *= 2.0;

        let mut affine = std::collections::HashMap::new();
        rasterize(near, Extent::new(8, 8), CullMode::None, |f| {
            affine.insert((f.x, f.y), f.bary.z);
        });
        let mut strictly_less = false;
        rasterize(far, Extent::new(8, 8), CullMode::None, |f| {
            let screen_weight = affine[&(f.x, f.y)];
            assert!(f.bary.z <= screen_weight + 1e-6);
            strictly_less |= f.bary.z < screen_weight - 1e-3;
        });
        assert!(strictly_less);
    }

    #[test]
    fn behind_the_eye_is_dropped() {
        let mut clip = ccw();
        clip[0].w = -1.0;
        assert!(coverage(clip, CullMode::None).is_empty());
    }
}
