use crate::config::RendererConfig;
use crate::error::{GraphError, TargetError};
use crate::params::FrameParams;
use crate::render_graph::{PassDesc, PassIo, Program, RenderGraph, RenderGraphBuilder};
use crate::scene::HeadlessDraw;
use crate::target::{
    ColorFormat, Extent, SizePolicy, TargetDesc, TargetFactory, TargetInfo,
};

use super::programs::{self, FrameInputs};
use super::{HeadlessFactory, Image, ImageTarget};

fn display_desc() -> TargetDesc {
    TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba8Unorm, true)
}

/// Runs a render graph on the CPU.
///
/// The display is an 8-bit RGBA image with a depth attachment, standing in
/// for the swapchain surface.
pub struct HeadlessRenderer {
    factory: HeadlessFactory,
    graph: RenderGraph<ImageTarget>,
    display: ImageTarget,
    clear_color: [f32; 4],
}

impl HeadlessRenderer {
    pub fn new(config: &RendererConfig, extent: Extent) -> Result<Self, GraphError> {
        Self::with_graph(
            config.pipeline.graph(config.shadow_map_size),
            config.clear_color,
            extent,
        )
    }

    pub fn with_graph(
        builder: RenderGraphBuilder,
        clear_color: [f32; 4],
        extent: Extent,
    ) -> Result<Self, GraphError> {
        let factory = HeadlessFactory::default();
        let graph = builder.build(&factory, extent)?;
        let desc = display_desc();
        desc.validate("display", extent, &factory.limits())?;
        Ok(Self {
            factory,
            graph,
            display: ImageTarget::new(&desc, extent),
            clear_color,
        })
    }

    pub fn graph(&self) -> &RenderGraph<ImageTarget> {
        &self.graph
    }

    pub fn display(&self) -> Result<&Image, TargetError> {
        self.display.color(0)
    }

    /// Recreates surface-sized targets and the display at `extent`.
    pub fn resize(&mut self, extent: Extent) -> Result<usize, TargetError> {
        let recreated = self.graph.resize(&self.factory, extent)?;
        if !extent.is_empty() && self.display.extent() != extent {
            self.display = ImageTarget::new(&display_desc(), extent);
        }
        Ok(recreated)
    }

    /// Executes every pass and returns the display image.
    pub fn render(
        &mut self,
        params: &FrameParams,
        draws: &[HeadlessDraw<'_>],
    ) -> Result<&Image, GraphError> {
        let frame = FrameInputs {
            params,
            draws,
            clear_color: self.clear_color,
        };
        let display = &mut self.display;
        self.graph
            .execute(|_, pass, mut io| run_pass(&frame, pass, &mut io, display))?;
        Ok(self.display.color(0)?)
    }
}

fn run_pass(
    frame: &FrameInputs<'_, '_>,
    pass: &PassDesc,
    io: &mut PassIo<'_, ImageTarget>,
    display: &mut ImageTarget,
) -> Result<(), GraphError> {
    log::trace!("headless pass '{}'", pass.name);
    match pass.program {
        Program::Forward => programs::forward(frame, pass.cull, programs::output(io, display)),
        Program::Geometry => programs::geometry(frame, pass.cull, programs::output(io, display)),
        Program::Shadow => programs::shadow(frame, pass.cull, programs::output(io, display)),
        Program::Lighting => programs::lighting(frame, io, display),
        Program::PostProcess => programs::post_process(frame, io, display),
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};

    use super::*;
    use crate::camera::Camera;
    use crate::mesh::MeshData;
    use crate::params::{PostEffect, PostSettings};
    use crate::render_graph::PipelineConfig;
    use crate::render_graph::config::{GBUFFER, LIT, SHADOW_MAP, gbuffer};
    use crate::scene::Draw;

    const SIZE: Extent = Extent::new(32, 32);

    fn params(post: PostSettings) -> FrameParams {
        FrameParams {
            camera: Camera::default().at(Vec3::new(0.0, 0.0, 3.0)).with_aspect(1.0),
            post,
            ..Default::default()
        }
    }

    fn renderer(pipeline: PipelineConfig) -> HeadlessRenderer {
        let config = RendererConfig::new().pipeline(pipeline).shadow_map_size(64);
        HeadlessRenderer::new(&config, SIZE).unwrap()
    }

    fn clear_rgba8() -> [f32; 4] {
        ColorFormat::Rgba8Unorm.quantize(RendererConfig::default().clear_color)
    }

    #[test]
    fn triangle_written_by_geometry_is_lit() {
        let mut renderer = renderer(PipelineConfig::Deferred);
        let triangle = MeshData::triangle();
        let draws = [Draw::new(&triangle, Mat4::IDENTITY).tint(Vec4::new(1.0, 0.2, 0.2, 1.0))];

        let display = renderer.render(&params(PostSettings::default()), &draws).unwrap().clone();

        let center = display.get(16, 16);
        assert_ne!(center, clear_rgba8());
        assert!(center[0] > center[1], "tint should dominate: {center:?}");
        assert_eq!(display.get(0, 0), clear_rgba8());

        let targets = renderer.graph().targets();
        let gbuffer_target = renderer.graph().target(targets.find(GBUFFER).unwrap()).unwrap();
        let albedo = gbuffer_target.color(gbuffer::ALBEDO).unwrap();
        assert_eq!(albedo.get(16, 16)[3], 1.0);
        assert_eq!(albedo.get(0, 0)[3], 0.0);
        let normal = gbuffer_target.color(gbuffer::NORMAL).unwrap().get(16, 16);
        assert!(Vec3::new(normal[0], normal[1], normal[2]).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn shadow_map_sees_the_triangle() {
        let mut renderer = renderer(PipelineConfig::Deferred);
        let cube = MeshData::cube();
        let draws = [Draw::new(&cube, Mat4::IDENTITY)];
        renderer.render(&params(PostSettings::default()), &draws).unwrap();

        let graph = renderer.graph();
        let shadow = graph.target(graph.targets().find(SHADOW_MAP).unwrap()).unwrap();
        let depth = shadow.depth().unwrap();
        assert!(depth.get(32, 32) < 1.0);
        assert_eq!(depth.get(0, 0), 1.0);
    }

    #[test]
    fn identity_post_equals_lighting_output() {
        let mut renderer = renderer(PipelineConfig::Deferred);
        let cube = MeshData::cube();
        let model = Mat4::from_rotation_y(0.6) * Mat4::from_rotation_x(0.4);
        let draws = [Draw::new(&cube, model)];

        let display = renderer.render(&params(PostSettings::default()), &draws).unwrap().clone();

        let graph = renderer.graph();
        let lit = graph.target(graph.targets().find(LIT).unwrap()).unwrap();
        let expected = lit.color(0).unwrap().map(|p| ColorFormat::Rgba8Unorm.quantize(p));
        assert_eq!(display, expected);
    }

    #[test]
    fn invert_flips_the_display() {
        let cube = MeshData::cube();
        let draws = [Draw::new(&cube, Mat4::from_rotation_y(0.3))];

        let mut plain = renderer(PipelineConfig::ForwardPostProcess);
        let base = plain.render(&params(PostSettings::default()), &draws).unwrap().clone();

        let mut inverted = renderer(PipelineConfig::ForwardPostProcess);
        let invert = PostSettings {
            effect: PostEffect::Invert,
            ..Default::default()
        };
        let flipped = inverted.render(&params(invert), &draws).unwrap();

        let (a, b) = (base.get(16, 16), flipped.get(16, 16));
        for c in 0..3 {
            assert!((a[c] + b[c] - 1.0).abs() <= 1.0 / 255.0 + 1e-6);
        }
    }

    #[test]
    fn zero_radius_blur_matches_identity() {
        let cube = MeshData::cube();
        let draws = [Draw::new(&cube, Mat4::from_rotation_y(0.3))];

        let mut a = renderer(PipelineConfig::Deferred);
        let identity = a.render(&params(PostSettings::default()), &draws).unwrap().clone();

        let mut b = renderer(PipelineConfig::Deferred);
        let blur = PostSettings {
            effect: PostEffect::BoxBlur,
            radius: 0,
        };
        assert_eq!(b.render(&params(blur), &draws).unwrap(), &identity);
    }

    #[test]
    fn forward_only_draws_straight_to_display() {
        let mut renderer = renderer(PipelineConfig::Forward);
        assert!(renderer.graph().targets().is_empty());
        let triangle = MeshData::triangle();
        let draws = [Draw::new(&triangle, Mat4::IDENTITY)];
        let display = renderer.render(&params(PostSettings::default()), &draws).unwrap();
        assert_ne!(display.get(16, 16), clear_rgba8());
        assert_eq!(display.get(0, 0), clear_rgba8());
    }

    #[test]
    fn empty_texture_draws_like_an_untextured_mesh() {
        let triangle = MeshData::triangle();
        let empty = Image::new(0, 0, [0.0; 4]);
        let tint = Vec4::new(0.3, 0.8, 0.4, 1.0);

        let mut plain = renderer(PipelineConfig::Forward);
        let draws = [Draw::new(&triangle, Mat4::IDENTITY).tint(tint)];
        let expected = plain.render(&params(PostSettings::default()), &draws).unwrap().clone();

        let mut textured = renderer(PipelineConfig::Forward);
        let draws = [Draw::new(&triangle, Mat4::IDENTITY).tint(tint).texture(&empty)];
        let display = textured.render(&params(PostSettings::default()), &draws).unwrap();

        assert_ne!(display.get(16, 16), clear_rgba8());
        assert_eq!(display, &expected);
    }

    #[test]
    fn back_faces_are_culled() {
        let mut renderer = renderer(PipelineConfig::Forward);
        let triangle = MeshData::triangle();
        let draws = [Draw::new(&triangle, Mat4::from_rotation_y(std::f32::consts::PI))];
        let display = renderer.render(&params(PostSettings::default()), &draws).unwrap();
        assert_eq!(display.get(16, 16), clear_rgba8());
    }

    #[test]
    fn resize_updates_surface_targets_before_next_frame() {
        let mut renderer = renderer(PipelineConfig::Deferred);
        let bigger = Extent::new(48, 24);
        let recreated = renderer.resize(bigger).unwrap();
        assert_eq!(recreated, 2);

        let graph = renderer.graph();
        let extent_of = |label| graph.target(graph.targets().find(label).unwrap()).unwrap().extent();
        assert_eq!(extent_of(GBUFFER), bigger);
        assert_eq!(extent_of(LIT), bigger);
        assert_eq!(extent_of(SHADOW_MAP), Extent::new(64, 64));

        let triangle = MeshData::triangle();
        let draws = [Draw::new(&triangle, Mat4::IDENTITY)];
        let display = renderer.render(&params(PostSettings::default()), &draws).unwrap();
        assert_eq!(display.extent(), bigger);
    }
}
