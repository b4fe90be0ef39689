//! Full-screen deferred lighting.

use crate::error::GraphError;
use crate::gpu::GpuContext;
use crate::render_graph::config::lighting_units;
use crate::render_graph::{PassDesc, PassIo};
use crate::target::OffscreenTarget;

use super::{OutputLayout, PassResources, RenderContext};

/// Shades every pixel from the geometry buffer and the shadow map.
///
/// Inputs are bound at group 1 with binding = texture unit: position, normal
/// and albedo are read with `textureLoad`, the shadow map through a
/// comparison sampler at binding 4.
pub struct LightingPass {
    label: String,
    pipeline: wgpu::RenderPipeline,
    inputs_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
}

impl LightingPass {
    const SAMPLER_BINDING: u32 = 4;

    pub fn new(
        gpu: &GpuContext,
        resources: &PassResources,
        pass: &PassDesc,
        output: &OutputLayout,
    ) -> Self {
        let device = &gpu.device;
        let shader = super::shader(gpu, "Lighting Shader", include_str!("../shaders/lighting.wgsl"));

        let gbuffer_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let inputs_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Inputs Layout"),
            entries: &[
                gbuffer_entry(lighting_units::POSITION),
                gbuffer_entry(lighting_units::NORMAL),
                gbuffer_entry(lighting_units::ALBEDO),
                wgpu::BindGroupLayoutEntry {
                    binding: lighting_units::SHADOW,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: Self::SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lighting Pipeline Layout"),
            bind_group_layouts: &[&resources.frame_layout, &inputs_layout],
            push_constant_ranges: &[],
        });

        let targets = output.color_targets();
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lighting Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
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
        });

        Self {
            label: pass.name.clone(),
            pipeline,
            inputs_layout,
            shadow_sampler,
        }
    }

    pub fn record(
        &self,
        ctx: &RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        io: &mut PassIo<'_, OffscreenTarget>,
    ) -> Result<(), GraphError> {
        let position = super::input_view(io, lighting_units::POSITION)?;
        let normal = super::input_view(io, lighting_units::NORMAL)?;
        let albedo = super::input_view(io, lighting_units::ALBEDO)?;
        let shadow_map = super::input_view(io, lighting_units::SHADOW)?;

        // Targets are recreated on resize, so the group is rebuilt each frame.
        let inputs = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Inputs"),
            layout: &self.inputs_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: lighting_units::POSITION,
                    resource: wgpu::BindingResource::TextureView(position),
                },
                wgpu::BindGroupEntry {
                    binding: lighting_units::NORMAL,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
                wgpu::BindGroupEntry {
                    binding: lighting_units::ALBEDO,
                    resource: wgpu::BindingResource::TextureView(albedo),
                },
                wgpu::BindGroupEntry {
                    binding: lighting_units::SHADOW,
                    resource: wgpu::BindingResource::TextureView(shadow_map),
                },
                wgpu::BindGroupEntry {
                    binding: Self::SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        });

        let views = super::output_views(io, &ctx.display);
        let colors = views.color_attachments(ctx.clear());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &colors,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &ctx.resources.frame_bind_group, &[]);
        render_pass.set_bind_group(1, &inputs, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_bindings_follow_texture_units() {
        let source = include_str!("../shaders/lighting.wgsl");
        for (unit, name) in [
            (lighting_units::POSITION, "g_position"),
            (lighting_units::NORMAL, "g_normal"),
            (lighting_units::ALBEDO, "g_albedo"),
            (lighting_units::SHADOW, "shadow_map"),
            (LightingPass::SAMPLER_BINDING, "shadow_sampler"),
        ] {
            let decl = format!("@group(1) @binding({unit}) var {name}:");
            assert!(source.contains(&decl), "missing `{decl}`");
        }
    }
}
