//! GPU render targets.

use crate::error::TargetError;
use crate::target::{ColorFormat, DEPTH_FORMAT, Extent, TargetDesc, TargetInfo};

/// One color attachment: texture, its default view, and its format.
pub struct ColorAttachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: ColorFormat,
}

/// The depth attachment of a target.
pub struct DepthAttachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// An offscreen target that can be rendered into by one pass and sampled by
/// the passes after it.
///
/// Every attachment is created with `RENDER_ATTACHMENT | TEXTURE_BINDING`
/// so the same texture works as a write destination and a shader input, plus
/// `COPY_SRC` for readback.
pub struct OffscreenTarget {
    label: String,
    extent: Extent,
    colors: Vec<ColorAttachment>,
    depth: Option<DepthAttachment>,
}

impl OffscreenTarget {
    /// Allocates the textures of `desc` at `extent`.
    ///
    /// Callers are expected to have run [`TargetDesc::validate`] first;
    /// [`TargetPool::create`](crate::target::TargetPool::create) does.
    pub fn new(device: &wgpu::Device, label: &str, desc: &TargetDesc, extent: Extent) -> Self {
        let size = wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        };
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;

        let colors = desc
            .colors
            .iter()
            .map(|spec| {
                let texture_label = format!("{label}/{}", spec.label);
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&texture_label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: spec.format.to_wgpu(),
                    usage,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                ColorAttachment {
                    texture,
                    view,
                    format: spec.format,
                }
            })
            .collect();

        let depth = desc.depth.then(|| {
            let texture_label = format!("{label}/depth");
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&texture_label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            DepthAttachment { texture, view }
        });

        log::debug!(
            "allocated target '{label}' {}x{} ({} color, depth: {})",
            extent.width,
            extent.height,
            desc.colors.len(),
            desc.depth
        );

        Self {
            label: label.to_string(),
            extent,
            colors,
            depth,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Color attachment `index`; indices past the declared count are an error.
    pub fn color(&self, index: usize) -> Result<&ColorAttachment, TargetError> {
        self.colors
            .get(index)
            .ok_or(TargetError::AttachmentOutOfRange {
                index,
                count: self.colors.len(),
            })
    }

    pub fn colors(&self) -> &[ColorAttachment] {
        &self.colors
    }

    pub fn depth(&self) -> Result<&DepthAttachment, TargetError> {
        self.depth.as_ref().ok_or(TargetError::MissingDepth)
    }
}

impl TargetInfo for OffscreenTarget {
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
