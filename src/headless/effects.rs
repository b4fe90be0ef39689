//! Post-process effects on CPU images.

use crate::params::{PostEffect, PostSettings};

use super::Image;

/// Applies the effect selected in `settings` to `src`.
pub fn apply(settings: &PostSettings, src: &Image) -> Image {
    match settings.effect {
        PostEffect::None => src.clone(),
        PostEffect::Invert => invert(src),
        PostEffect::BoxBlur => box_blur(src, settings.radius),
    }
}

/// `1 - rgb`; alpha is kept.
pub fn invert(src: &Image) -> Image {
    src.map(|[r, g, b, a]| [1.0 - r, 1.0 - g, 1.0 - b, a])
}

/// Mean over the `(2r + 1)²` texels around each pixel, clamped to the edge.
///
/// Done as a horizontal then a vertical pass; with edge clamping per axis
/// this equals the full square kernel.
pub fn box_blur(src: &Image, radius: u32) -> Image {
    if radius == 0 {
        return src.clone();
    }
    let r = radius as i64;
    let taps = (2 * r + 1) as f32;

    let blur_axis = |img: &Image, horizontal: bool| {
        Image::from_fn(img.width(), img.height(), |x, y| {
            let mut sum = [0.0f32; 4];
            for k in -r..=r {
                let p = if horizontal {
                    img.get_clamped(x as i64 + k, y as i64)
                } else {
                    img.get_clamped(x as i64, y as i64 + k)
                };
                for c in 0..4 {
                    sum[c] += p[c];
                }
            }
            sum.map(|s| s / taps)
        })
    };

    let horizontal = blur_axis(src, true);
    blur_axis(&horizontal, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Left half black, right half white.
    fn step(width: u32, height: u32) -> Image {
        Image::from_fn(width, height, |x, _| {
            let v = if x < width / 2 { 0.0 } else { 1.0 };
            [v, v, v, 1.0]
        })
    }

    fn noise(width: u32, height: u32) -> Image {
        Image::from_fn(width, height, |x, y| {
            let h = (x.wrapping_mul(374761393) ^ y.wrapping_mul(668265263)) % 1000;
            let v = h as f32 / 1000.0;
            [v, 1.0 - v, v * 0.5, 1.0]
        })
    }

    #[test]
    fn identity_copies() {
        let img = noise(7, 5);
        let out = apply(&PostSettings::default(), &img);
        assert_eq!(out, img);
    }

    #[test]
    fn invert_twice_is_identity() {
        let img = noise(6, 6);
        let twice = invert(&invert(&img));
        assert!(twice.max_abs_diff(&img).unwrap() < 1e-6);
        assert_eq!(invert(&img).get(2, 3)[3], 1.0);
    }

    #[test]
    fn zero_radius_blur_is_identity() {
        let img = noise(9, 4);
        let settings = PostSettings {
            effect: PostEffect::BoxBlur,
            radius: 0,
        };
        assert_eq!(apply(&settings, &img), img);
    }

    #[test]
    fn blur_keeps_constant_images() {
        let img = Image::new(5, 5, [0.3, 0.6, 0.9, 1.0]);
        assert!(box_blur(&img, 3).max_abs_diff(&img).unwrap() < 1e-6);
    }

    #[test]
    fn blur_matches_square_kernel() {
        let img = noise(6, 5);
        let blurred = box_blur(&img, 1);
        let (x, y) = (0i64, 2i64);
        let mut sum = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                sum += img.get_clamped(x + dx, y + dy)[0];
            }
        }
        assert!((blurred.get(0, 2)[0] - sum / 9.0).abs() < 1e-5);
    }

    #[test]
    fn variance_does_not_grow_with_radius() {
        let img = step(16, 4);
        let mut previous = img.variance(0);
        for radius in 1..=6 {
            let variance = box_blur(&img, radius).variance(0);
            assert!(
                variance <= previous + 1e-6,
                "radius {radius}: {variance} > {previous}"
            );
            previous = variance;
        }
        assert!(previous < img.variance(0));
    }
}
