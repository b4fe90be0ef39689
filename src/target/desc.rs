use crate::error::TargetError;
use crate::target::ColorFormat;

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// How a target's size is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizePolicy {
    /// Follows the display surface and is recreated when it resizes.
    Surface,
    /// Fixed at creation (shadow maps).
    Fixed(Extent),
}

/// One color attachment of a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub label: String,
    pub format: ColorFormat,
}

impl AttachmentSpec {
    pub fn new(label: impl Into<String>, format: ColorFormat) -> Self {
        Self {
            label: label.into(),
            format,
        }
    }
}

/// Device limits that decide whether a target description is complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetLimits {
    pub max_dimension: u32,
    pub max_color_attachments: usize,
    pub max_color_bytes_per_sample: u32,
}

impl Default for TargetLimits {
    /// wgpu's default limits.
    fn default() -> Self {
        Self {
            max_dimension: 8192,
            max_color_attachments: 8,
            max_color_bytes_per_sample: 32,
        }
    }
}

impl From<&wgpu::Limits> for TargetLimits {
    fn from(limits: &wgpu::Limits) -> Self {
        Self {
            max_dimension: limits.max_texture_dimension_2d,
            max_color_attachments: limits.max_color_attachments as usize,
            max_color_bytes_per_sample: limits.max_color_attachment_bytes_per_sample,
        }
    }
}

/// Result of a successful completeness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetStatus {
    Complete,
}

/// Everything needed to allocate an offscreen target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    pub size: SizePolicy,
    pub colors: Vec<AttachmentSpec>,
    pub depth: bool,
}

impl TargetDesc {
    /// One color attachment and, if `depth` is set, a depth attachment.
    pub fn color(size: SizePolicy, format: ColorFormat, depth: bool) -> Self {
        Self {
            size,
            colors: vec![AttachmentSpec::new("color", format)],
            depth,
        }
    }

    /// Several color attachments in one target, as used for geometry buffers.
    pub fn multi(size: SizePolicy, colors: Vec<AttachmentSpec>, depth: bool) -> Self {
        Self {
            size,
            colors,
            depth,
        }
    }

    pub fn depth_only(size: SizePolicy) -> Self {
        Self {
            size,
            colors: Vec::new(),
            depth: true,
        }
    }

    pub fn follows_surface(&self) -> bool {
        self.size == SizePolicy::Surface
    }

    pub fn resolve(&self, surface: Extent) -> Extent {
        match self.size {
            SizePolicy::Surface => surface,
            SizePolicy::Fixed(extent) => extent,
        }
    }

    pub fn color_bytes_per_sample(&self) -> u32 {
        self.colors.iter().map(|c| c.format.bytes_per_pixel()).sum()
    }

    /// Checks the description the way a framebuffer completeness check would.
    pub fn validate(
        &self,
        label: &str,
        extent: Extent,
        limits: &TargetLimits,
    ) -> Result<TargetStatus, TargetError> {
        let label = label.to_string();
        if self.colors.is_empty() && !self.depth {
            return Err(TargetError::NoAttachments { label });
        }
        if extent.is_empty() {
            return Err(TargetError::ZeroSize {
                label,
                width: extent.width,
                height: extent.height,
            });
        }
        if extent.width > limits.max_dimension || extent.height > limits.max_dimension {
            return Err(TargetError::TooLarge {
                label,
                width: extent.width,
                height: extent.height,
                max: limits.max_dimension,
            });
        }
        if self.colors.len() > limits.max_color_attachments {
            return Err(TargetError::TooManyColorAttachments {
                label,
                count: self.colors.len(),
                max: limits.max_color_attachments,
            });
        }
        let bytes = self.color_bytes_per_sample();
        if bytes > limits.max_color_bytes_per_sample {
            return Err(TargetError::TooManyColorBytes {
                label,
                bytes,
                max: limits.max_color_bytes_per_sample,
            });
        }
        Ok(TargetStatus::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Extent = Extent::new(640, 480);

    #[test]
    fn single_color_target_is_complete() {
        let desc = TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, true);
        let status = desc.validate("scene", SIZE, &TargetLimits::default());
        assert_eq!(status, Ok(TargetStatus::Complete));
        assert_eq!(desc.resolve(SIZE), SIZE);
    }

    #[test]
    fn fixed_size_ignores_surface() {
        let fixed = Extent::new(2048, 2048);
        let desc = TargetDesc::depth_only(SizePolicy::Fixed(fixed));
        assert_eq!(desc.resolve(SIZE), fixed);
        assert!(!desc.follows_surface());
    }

    #[test]
    fn empty_target_is_incomplete() {
        let desc = TargetDesc::multi(SizePolicy::Surface, Vec::new(), false);
        assert_eq!(
            desc.validate("nothing", SIZE, &TargetLimits::default()),
            Err(TargetError::NoAttachments {
                label: "nothing".into()
            })
        );
    }

    #[test]
    fn zero_and_oversized_extents_fail() {
        let desc = TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba8Unorm, false);
        let limits = TargetLimits::default();
        assert!(matches!(
            desc.validate("t", Extent::new(0, 10), &limits),
            Err(TargetError::ZeroSize { .. })
        ));
        assert!(matches!(
            desc.validate("t", Extent::new(9000, 10), &limits),
            Err(TargetError::TooLarge { max: 8192, .. })
        ));
    }

    #[test]
    fn attachment_count_is_limited() {
        let colors = (0..9)
            .map(|i| AttachmentSpec::new(format!("c{i}"), ColorFormat::Rgba8Unorm))
            .collect();
        let desc = TargetDesc::multi(SizePolicy::Surface, colors, false);
        let limits = TargetLimits {
            max_color_bytes_per_sample: 64,
            ..Default::default()
        };
        assert_eq!(
            desc.validate("wide", SIZE, &limits),
            Err(TargetError::TooManyColorAttachments {
                label: "wide".into(),
                count: 9,
                max: 8,
            })
        );
    }

    #[test]
    fn color_bytes_are_limited() {
        let colors = (0..3)
            .map(|i| AttachmentSpec::new(format!("c{i}"), ColorFormat::Rgba32Float))
            .collect();
        let desc = TargetDesc::multi(SizePolicy::Surface, colors, true);
        assert!(matches!(
            desc.validate("fat", SIZE, &TargetLimits::default()),
            Err(TargetError::TooManyColorBytes { bytes: 48, max: 32, .. })
        ));
    }
}
