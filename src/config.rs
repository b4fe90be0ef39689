//! Renderer and window configuration.

use crate::render_graph::PipelineConfig;

/// Renderer settings fixed at construction.
///
/// ```
/// use rigpass::{PipelineConfig, RendererConfig};
///
/// let config = RendererConfig::new()
///     .pipeline(PipelineConfig::ForwardPostProcess)
///     .shadow_map_size(1024)
///     .vsync(false);
/// assert_eq!(config.shadow_map_size, 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub pipeline: PipelineConfig,
    /// Width and height of the square shadow map.
    pub shadow_map_size: u32,
    /// Background color for pixels no geometry covers.
    pub clear_color: [f32; 4],
    /// Wait for vertical blank (`Fifo`) instead of presenting immediately.
    pub vsync: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::Deferred,
            shadow_map_size: 2048,
            clear_color: [0.6, 0.8, 0.92, 1.0],
            vsync: true,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    pub fn clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

/// Demo window settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "rigpass".to_string(),
            width: 1080,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
