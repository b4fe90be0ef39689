//! The wgpu renderer: a render graph plus one pass program per pass.

use std::sync::Arc;

use winit::window::Window;

use crate::config::RendererConfig;
use crate::error::{Result, TargetError};
use crate::gpu::GpuContext;
use crate::params::FrameParams;
use crate::passes::{OutputLayout, OutputViews, PassProgram, PassResources, RenderContext};
use crate::render_graph::{PassOutput, RenderGraph, RenderGraphBuilder};
use crate::scene::GpuDraw;
use crate::target::{OffscreenTarget, SizePolicy, TargetDesc, TargetFactory, TargetInfo};

const DISPLAY_DEPTH: &str = "display_depth";

/// Renders frames to a window surface.
///
/// Each call to [`render`](Self::render) brings surface-sized targets up to
/// date, records every pass in declared order into one command encoder,
/// submits it and presents.
///
/// ```no_run
/// # use std::sync::Arc;
/// # fn demo(window: Arc<winit::window::Window>) -> rigpass::Result<()> {
/// use rigpass::scene::Draw;
/// use rigpass::{FrameParams, Mat4, Mesh, Renderer, RendererConfig};
///
/// let mut renderer = Renderer::new(window, RendererConfig::default())?;
/// let cube = Mesh::cube(renderer.gpu());
/// renderer.render(&FrameParams::default(), &[Draw::new(&cube, Mat4::IDENTITY)])?;
/// # Ok(())
/// # }
/// ```
pub struct Renderer {
    gpu: GpuContext,
    config: RendererConfig,
    graph: RenderGraph<OffscreenTarget>,
    programs: Vec<PassProgram>,
    resources: PassResources,
    /// Depth buffer for passes that draw the scene straight to the display.
    display_depth: OffscreenTarget,
}

impl Renderer {
    /// Initializes the GPU for `window` and builds the configured pipeline.
    pub fn new(window: Arc<Window>, config: RendererConfig) -> Result<Self> {
        let gpu = GpuContext::new(window, &config)?;
        let builder = config.pipeline.graph(config.shadow_map_size);
        Self::with_graph(gpu, config, builder)
    }

    /// Builds a renderer around a custom pass sequence.
    pub fn with_graph(
        gpu: GpuContext,
        config: RendererConfig,
        builder: RenderGraphBuilder,
    ) -> Result<Self> {
        let graph = builder.build(&gpu, gpu.extent())?;
        let display_depth = display_depth(&gpu)?;
        let resources = PassResources::new(&gpu);

        let programs = graph
            .passes()
            .iter()
            .map(|pass| {
                let output = match pass.output {
                    PassOutput::Target(id) => OutputLayout::of_target(graph.target(id)?),
                    PassOutput::Display => OutputLayout::display(gpu.config.format),
                };
                Ok(PassProgram::new(&gpu, &resources, pass, &output))
            })
            .collect::<std::result::Result<Vec<_>, TargetError>>()?;

        log::info!(
            "renderer ready: {:?} pipeline, surface {:?}",
            config.pipeline,
            gpu.config.format
        );

        Ok(Self {
            gpu,
            config,
            graph,
            programs,
            resources,
            display_depth,
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn graph(&self) -> &RenderGraph<OffscreenTarget> {
        &self.graph
    }

    /// Resizes the surface and every target that follows it.
    ///
    /// A zero-sized window (minimized) leaves everything as it is.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.gpu.resize(width, height);
        self.sync_targets()
    }

    fn sync_targets(&mut self) -> Result<()> {
        let extent = self.gpu.extent();
        let recreated = self.graph.resize(&self.gpu, extent)?;
        if self.display_depth.extent() != extent {
            self.display_depth = display_depth(&self.gpu)?;
        }
        if recreated > 0 {
            log::debug!("recreated {recreated} targets at {}x{}", extent.width, extent.height);
        }
        Ok(())
    }

    /// Renders one frame.
    ///
    /// A lost or outdated surface reconfigures it and skips the frame with a
    /// warning; the next call renders normally.
    pub fn render(&mut self, params: &FrameParams, draws: &[GpuDraw<'_>]) -> Result<()> {
        self.sync_targets()?;

        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, skipping frame");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring surface texture, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let Self {
            gpu,
            config,
            graph,
            programs,
            resources,
            display_depth,
        } = self;

        resources.prepare(gpu, params, config.clear_color, draws);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let ctx = RenderContext {
            gpu,
            resources,
            params,
            draws,
            clear_color: config.clear_color,
            display: OutputViews {
                colors: vec![&surface_view],
                depth: Some(&display_depth.depth()?.view),
            },
        };
        graph.execute(|index, _, mut io| match programs.get(index) {
            Some(program) => program.record(&ctx, &mut encoder, &mut io),
            None => Ok(()),
        })?;

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn display_depth(gpu: &GpuContext) -> std::result::Result<OffscreenTarget, TargetError> {
    let desc = TargetDesc::depth_only(SizePolicy::Surface);
    let extent = gpu.extent();
    desc.validate(DISPLAY_DEPTH, extent, &gpu.limits())?;
    gpu.create_target(DISPLAY_DEPTH, &desc, extent)
}
