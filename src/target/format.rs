/// Pixel formats available for color attachments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 8-bit normalized RGBA.
    Rgba8Unorm,
    /// 16-bit float RGBA; the HDR scene and lighting format.
    Rgba16Float,
    /// 32-bit float RGBA. Not filterable, only read with `textureLoad`.
    Rgba32Float,
}

impl ColorFormat {
    /// Bytes one pixel occupies in a color attachment.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ColorFormat::Rgba8Unorm => 4,
            ColorFormat::Rgba16Float => 8,
            ColorFormat::Rgba32Float => 16,
        }
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            ColorFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            ColorFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            ColorFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }

    /// Rounds a value the way storing it in this format would.
    ///
    /// Float formats are kept at full precision by the headless backend.
    pub fn quantize(self, value: [f32; 4]) -> [f32; 4] {
        match self {
            ColorFormat::Rgba8Unorm => value.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0),
            ColorFormat::Rgba16Float | ColorFormat::Rgba32Float => value,
        }
    }
}

/// Depth attachments always use this format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
