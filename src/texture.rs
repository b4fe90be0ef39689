//! Sampled textures for scene draws.

use std::path::Path;

use crate::error::Result;
use crate::gpu::GpuContext;

/// Decodes an image file into tightly packed RGBA8 pixels.
pub(crate) fn load_rgba8(path: impl AsRef<Path>) -> Result<image::RgbaImage> {
    let path = path.as_ref();
    let img = image::open(path)?.to_rgba8();
    log::debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// An RGBA texture with its view and sampler, ready to bind.
#[derive(Debug)]
pub struct Texture {
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Creates a texture from tightly packed RGBA8 pixels.
    ///
    /// The data is treated as sRGB and sampled with linear filtering and
    /// repeat addressing.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Loads any format the `image` crate understands.
    pub fn from_file(gpu: &GpuContext, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = load_rgba8(path)?;
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, &path.display().to_string()))
    }

    /// 1×1 white; bound when a draw has no texture so the shader's sample is
    /// a no-op multiply.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255; 4], 1, 1, "White Texture")
    }

    /// Two-tone checkerboard with `cells` squares per side.
    pub fn checker(gpu: &GpuContext, size: u32, cells: u32, dark: [u8; 3], light: [u8; 3]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let [r, g, b] = if (x / cell + y / cell) % 2 == 0 { light } else { dark };
                data.extend_from_slice(&[r, g, b, 255]);
            }
        }
        Self::from_rgba(gpu, &data, size, size, "Checker Texture")
    }
}
