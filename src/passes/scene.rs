//! Programs that draw the scene's meshes: forward, geometry and shadow.

use crate::error::GraphError;
use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::render_graph::{PassDesc, PassIo, Program};
use crate::target::{DEPTH_FORMAT, OffscreenTarget};

use super::{OutputLayout, PassResources, RenderContext};

/// Vertex and fragment entry points in `scene.wgsl`. Shadow has no fragment
/// stage; it only writes depth.
fn entry_points(program: Program) -> (&'static str, Option<&'static str>) {
    match program {
        Program::Geometry => ("vs", Some("fs_geometry")),
        Program::Shadow => ("vs_shadow", None),
        _ => ("vs", Some("fs_forward")),
    }
}

/// Draws every mesh of the frame with depth testing.
///
/// - Forward shades with Blinn-Phong and writes one color attachment.
/// - Geometry writes world position, normal and albedo to three attachments,
///   cleared to zero so albedo alpha marks covered pixels.
/// - Shadow renders from the light camera into depth only.
pub struct ScenePass {
    label: String,
    program: Program,
    pipeline: wgpu::RenderPipeline,
}

impl ScenePass {
    pub fn new(
        gpu: &GpuContext,
        resources: &PassResources,
        pass: &PassDesc,
        output: &OutputLayout,
    ) -> Self {
        let device = &gpu.device;
        let shader = super::shader(gpu, "Scene Shader", include_str!("../shaders/scene.wgsl"));

        let mut bind_group_layouts = vec![&resources.frame_layout, &resources.model_layout];
        if pass.program != Program::Shadow {
            bind_group_layouts.push(&resources.texture_layout);
        }
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", pass.name)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let (vs, fs) = entry_points(pass.program);
        let targets = output.color_targets();
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", pass.name)),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(vs),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: fs.map(|entry| wgpu::FragmentState {
                module: &shader,
                entry_point: Some(entry),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: pass.cull.to_wgpu(),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: output.depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            label: pass.name.clone(),
            program: pass.program,
            pipeline,
        }
    }

    pub fn record(
        &self,
        ctx: &RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        io: &mut PassIo<'_, OffscreenTarget>,
    ) -> Result<(), GraphError> {
        let resources = ctx.resources;
        let views = super::output_views(io, &ctx.display);
        let depth = views
            .depth_attachment()
            .ok_or_else(|| super::missing_depth(&self.label))?;
        let colors = match self.program {
            Program::Shadow => Vec::new(),
            Program::Geometry => views.color_attachments(wgpu::Color::TRANSPARENT),
            _ => views.color_attachments(ctx.clear()),
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &colors,
            depth_stencil_attachment: Some(depth),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &resources.frame_bind_group, &[]);

        let draws = ctx.draws.iter().zip(&resources.texture_groups);
        for (index, (draw, texture_group)) in draws.enumerate() {
            render_pass.set_bind_group(1, &resources.models.bind_group, &[resources.models.offset(index)]);
            if self.program != Program::Shadow {
                render_pass.set_bind_group(2, texture_group, &[]);
            }
            render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = include_str!("../shaders/scene.wgsl");

    #[test]
    fn entry_points_exist_in_the_shader() {
        for program in [Program::Forward, Program::Geometry, Program::Shadow] {
            let (vs, fs) = entry_points(program);
            assert!(SOURCE.contains(&format!("fn {vs}(")), "{program:?} vertex");
            if let Some(fs) = fs {
                assert!(SOURCE.contains(&format!("fn {fs}(")), "{program:?} fragment");
            }
        }
        assert_eq!(entry_points(Program::Shadow).1, None);
    }
}
