use crate::error::TargetError;
use crate::target::{ColorFormat, Extent, TargetDesc, TargetFactory, TargetInfo, TargetLimits};

/// RGBA float pixels, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Image {
    pub fn new(width: u32, height: u32, fill: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [f32; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Converts an 8-bit image, e.g. one loaded with `image::open`.
    pub fn from_rgba8(img: &image::RgbaImage) -> Self {
        Self::from_fn(img.width(), img.height(), |x, y| {
            img.get_pixel(x, y).0.map(|c| c as f32 / 255.0)
        })
    }

    /// Loads any format the `image` crate understands, for use as a draw
    /// texture.
    pub fn open(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        Ok(Self::from_rgba8(&crate::texture::load_rgba8(path)?))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[self.index(x, y)]
    }

    /// Texel fetch with coordinates clamped to the edge. An empty image reads
    /// as transparent black.
    pub fn get_clamped(&self, x: i64, y: i64) -> [f32; 4] {
        if self.pixels.is_empty() {
            return [0.0; 4];
        }
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }

    pub fn set(&mut self, x: u32, y: u32, value: [f32; 4]) {
        let index = self.index(x, y);
        self.pixels[index] = value;
    }

    pub fn fill(&mut self, value: [f32; 4]) {
        self.pixels.fill(value);
    }

    /// Nearest-neighbour sample with repeat addressing.
    pub fn sample_repeat(&self, u: f32, v: f32) -> [f32; 4] {
        let x = (u.rem_euclid(1.0) * self.width as f32) as i64;
        let y = (v.rem_euclid(1.0) * self.height as f32) as i64;
        self.get_clamped(x, y)
    }

    pub fn map(&self, f: impl Fn([f32; 4]) -> [f32; 4]) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&p| f(p)).collect(),
        }
    }

    /// Per-channel mean.
    pub fn mean(&self) -> [f64; 4] {
        let mut sum = [0.0f64; 4];
        for p in &self.pixels {
            for c in 0..4 {
                sum[c] += p[c] as f64;
            }
        }
        let n = self.pixels.len().max(1) as f64;
        sum.map(|s| s / n)
    }

    /// Population variance of one channel.
    pub fn variance(&self, channel: usize) -> f64 {
        let mean = self.mean()[channel];
        let n = self.pixels.len().max(1) as f64;
        self.pixels
            .iter()
            .map(|p| (p[channel] as f64 - mean).powi(2))
            .sum::<f64>()
            / n
    }

    /// Largest per-channel difference; `None` if the sizes differ.
    pub fn max_abs_diff(&self, other: &Image) -> Option<f32> {
        if self.extent() != other.extent() {
            return None;
        }
        let diff = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .flat_map(|(a, b)| (0..4).map(move |c| (a[c] - b[c]).abs()))
            .fold(0.0, f32::max);
        Some(diff)
    }

    pub fn to_rgba8(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(self.get(x, y).map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        })
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), image::ImageError> {
        self.to_rgba8().save(path)
    }
}

/// Depth values in 0..1, cleared to the far plane.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    depth: Vec<f32>,
}

impl DepthImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: vec![1.0; width as usize * height as usize],
        }
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.depth.fill(1.0);
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.depth[y as usize * self.width as usize + x as usize]
    }

    /// Stores `depth` if it is nearer than the current value.
    pub fn test_and_set(&mut self, x: u32, y: u32, depth: f32) -> bool {
        let index = y as usize * self.width as usize + x as usize;
        if depth < self.depth[index] {
            self.depth[index] = depth;
            true
        } else {
            false
        }
    }
}

/// The headless counterpart of [`OffscreenTarget`](crate::target::OffscreenTarget).
#[derive(Clone, Debug)]
pub struct ImageTarget {
    extent: Extent,
    formats: Vec<ColorFormat>,
    colors: Vec<Image>,
    depth: Option<DepthImage>,
}

impl ImageTarget {
    pub fn new(desc: &TargetDesc, extent: Extent) -> Self {
        Self {
            extent,
            formats: desc.colors.iter().map(|c| c.format).collect(),
            colors: desc
                .colors
                .iter()
                .map(|_| Image::new(extent.width, extent.height, [0.0; 4]))
                .collect(),
            depth: desc
                .depth
                .then(|| DepthImage::new(extent.width, extent.height)),
        }
    }

    pub fn color(&self, index: usize) -> Result<&Image, TargetError> {
        self.colors.get(index).ok_or(TargetError::AttachmentOutOfRange {
            index,
            count: self.colors.len(),
        })
    }

    pub fn depth(&self) -> Result<&DepthImage, TargetError> {
        self.depth.as_ref().ok_or(TargetError::MissingDepth)
    }

    pub fn depth_mut(&mut self) -> Result<&mut DepthImage, TargetError> {
        self.depth.as_mut().ok_or(TargetError::MissingDepth)
    }

    /// Clears every color attachment to `color` and depth to the far plane.
    pub fn clear(&mut self, color: [f32; 4]) {
        for (image, format) in self.colors.iter_mut().zip(&self.formats) {
            image.fill(format.quantize(color));
        }
        if let Some(depth) = &mut self.depth {
            depth.clear();
        }
    }

    /// Writes a pixel, rounded the way the attachment's format stores it.
    pub fn store(&mut self, index: usize, x: u32, y: u32, value: [f32; 4]) -> Result<(), TargetError> {
        let count = self.colors.len();
        let (Some(image), Some(format)) = (self.colors.get_mut(index), self.formats.get(index))
        else {
            return Err(TargetError::AttachmentOutOfRange { index, count });
        };
        image.set(x, y, format.quantize(value));
        Ok(())
    }

    /// Replaces attachment `index` with `image`, quantized to its format.
    pub fn store_image(&mut self, index: usize, image: &Image) -> Result<(), TargetError> {
        let count = self.colors.len();
        let (Some(slot), Some(format)) = (self.colors.get_mut(index), self.formats.get(index))
        else {
            return Err(TargetError::AttachmentOutOfRange { index, count });
        };
        let format = *format;
        *slot = image.map(|p| format.quantize(p));
        Ok(())
    }
}

impl TargetInfo for ImageTarget {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn color_count(&self) -> usize {
        self.colors.len()
    }

    fn has_depth(&self) -> bool {
        self.depth.is_some()
    }
}

/// Allocates [`ImageTarget`]s under configurable limits.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessFactory {
    pub limits: TargetLimits,
}

impl TargetFactory for HeadlessFactory {
    type Target = ImageTarget;

    fn limits(&self) -> TargetLimits {
        self.limits
    }

    fn create_target(
        &self,
        label: &str,
        desc: &TargetDesc,
        extent: Extent,
    ) -> Result<ImageTarget, TargetError> {
        log::debug!(
            "allocated headless target '{label}' {}x{}",
            extent.width,
            extent.height
        );
        Ok(ImageTarget::new(desc, extent))
    }
}
