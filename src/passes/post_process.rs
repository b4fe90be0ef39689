//! Full-screen post effects.

use crate::error::GraphError;
use crate::gpu::GpuContext;
use crate::params::PostEffect;
use crate::render_graph::{PassDesc, PassIo};
use crate::target::OffscreenTarget;

use super::{OutputLayout, PassResources, RenderContext};

/// Fragment entry point in `post.wgsl` for each effect.
fn entry_point(effect: PostEffect) -> &'static str {
    match effect {
        PostEffect::None => "fs_identity",
        PostEffect::Invert => "fs_invert",
        PostEffect::BoxBlur => "fs_box_blur",
    }
}

/// One pipeline per [`PostEffect`].
struct EffectPipelines {
    identity: wgpu::RenderPipeline,
    invert: wgpu::RenderPipeline,
    box_blur: wgpu::RenderPipeline,
}

impl EffectPipelines {
    fn get(&self, effect: PostEffect) -> &wgpu::RenderPipeline {
        match effect {
            PostEffect::None => &self.identity,
            PostEffect::Invert => &self.invert,
            PostEffect::BoxBlur => &self.box_blur,
        }
    }
}

/// Applies the frame's [`PostEffect`] to the color input at texture unit 0.
///
/// The effect and blur radius are read from
/// [`FrameParams::post`](crate::FrameParams::post) once per frame.
pub struct PostProcessPass {
    label: String,
    pipelines: EffectPipelines,
    input_layout: wgpu::BindGroupLayout,
}

impl PostProcessPass {
    pub const INPUT_UNIT: u32 = 0;

    pub fn new(
        gpu: &GpuContext,
        resources: &PassResources,
        pass: &PassDesc,
        output: &OutputLayout,
    ) -> Self {
        let device = &gpu.device;
        let shader = super::shader(gpu, "Post Process Shader", include_str!("../shaders/post.wgsl"));

        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Process Input Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: Self::INPUT_UNIT,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Process Pipeline Layout"),
            bind_group_layouts: &[&resources.frame_layout, &input_layout],
            push_constant_ranges: &[],
        });

        let targets = output.color_targets();
        let build = |effect: PostEffect| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("Post Process Pipeline ({})", effect.name())),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point(effect)),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: pass.cull.to_wgpu(),
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Self {
            label: pass.name.clone(),
            pipelines: EffectPipelines {
                identity: build(PostEffect::None),
                invert: build(PostEffect::Invert),
                box_blur: build(PostEffect::BoxBlur),
            },
            input_layout,
        }
    }

    pub fn record(
        &self,
        ctx: &RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        io: &mut PassIo<'_, OffscreenTarget>,
    ) -> Result<(), GraphError> {
        let input = super::input_view(io, Self::INPUT_UNIT)?;
        let input_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Process Input"),
            layout: &self.input_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: Self::INPUT_UNIT,
                resource: wgpu::BindingResource::TextureView(input),
            }],
        });

        let effect = ctx.params.post.clamped().effect;
        let views = super::output_views(io, &ctx.display);
        let colors = views.color_attachments(ctx.clear());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &colors,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(self.pipelines.get(effect));
        render_pass.set_bind_group(0, &ctx.resources.frame_bind_group, &[]);
        render_pass.set_bind_group(1, &input_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }
}
