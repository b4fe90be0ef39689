//! GPU pass programs.
//!
//! The renderer builds one [`PassProgram`] per pass of its render graph, with
//! pipelines created for that pass's output formats and cull mode.
//!
//! # Bind Groups
//!
//! - **Group 0**: frame uniforms (cameras, light, material, shadow bias, blur
//!   radius), shared by every program
//! - **Group 1**: per-draw model uniforms for scene programs, bound with a
//!   dynamic offset; the pass's texture inputs for full-screen programs, one
//!   binding per texture unit
//! - **Group 2**: the draw's albedo texture (forward and geometry only)

mod lighting;
mod post_process;
mod scene;

use glam::{Mat3, Mat4, Vec4};

use crate::error::{GraphError, TargetError};
use crate::gpu::GpuContext;
use crate::params::FrameParams;
use crate::render_graph::{Attachment, PassDesc, PassIo, Program};
use crate::scene::GpuDraw;
use crate::target::{OffscreenTarget, TargetInfo};
use crate::texture::Texture;

pub use lighting::LightingPass;
pub use post_process::PostProcessPass;
pub use scene::ScenePass;

/// Uniforms shared by every pass of a frame.
///
/// Matches `struct Frame` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// Camera position in xyz, elapsed time in w.
    pub camera_pos: [f32; 4],
    pub to_light: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    /// ka, kd, ks, shininess.
    pub material: [f32; 4],
    /// Minimum and maximum shadow bias.
    pub shadow: [f32; 4],
    pub clear_color: [f32; 4],
    /// Blur radius in x.
    pub post: [f32; 4],
}

impl FrameUniforms {
    pub fn new(params: &FrameParams, clear_color: [f32; 4]) -> Self {
        let material = params.material.clamped();
        let shadow = params.shadow.clamped();
        let post = params.post.clamped();
        Self {
            view_proj: params.camera.view_projection().to_cols_array_2d(),
            light_view_proj: params.light_camera().view_projection().to_cols_array_2d(),
            camera_pos: params.camera.position.extend(params.time).to_array(),
            to_light: params.light.to_light().extend(0.0).to_array(),
            light_color: params.light.color.extend(1.0).to_array(),
            ambient: params.light.ambient.extend(1.0).to_array(),
            material: [material.ka, material.kd, material.ks, material.shininess],
            shadow: [shadow.min_bias, shadow.max_bias, 0.0, 0.0],
            clear_color,
            post: [post.radius as f32, 0.0, 0.0, 0.0],
        }
    }
}

/// Per-draw uniforms. Matches `struct Model` in `scene.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix, for non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl ModelUniforms {
    pub fn new(model: Mat4, tint: Vec4) -> Self {
        let normal_matrix = Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose());
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            tint: tint.to_array(),
        }
    }
}

/// Distance between consecutive [`ModelUniforms`] in the model buffer.
fn model_stride(min_offset_alignment: u32) -> u64 {
    wgpu::util::align_to(
        std::mem::size_of::<ModelUniforms>() as u64,
        min_offset_alignment.max(1) as u64,
    )
}

/// One uniform buffer holding every draw's [`ModelUniforms`], bound with a
/// dynamic offset per draw.
struct ModelBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl ModelBuffer {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn write(&mut self, gpu: &GpuContext, layout: &wgpu::BindGroupLayout, draws: &[GpuDraw<'_>]) {
        if draws.len() > self.capacity {
            let capacity = draws.len().next_power_of_two();
            log::debug!("growing model buffer to {capacity} draws");
            *self = Self::new(&gpu.device, layout, self.stride, capacity);
        }
        if draws.is_empty() {
            return;
        }

        let stride = self.stride as usize;
        let size = std::mem::size_of::<ModelUniforms>();
        let mut bytes = vec![0u8; draws.len() * stride];
        for (i, draw) in draws.iter().enumerate() {
            let uniforms = ModelUniforms::new(draw.model, draw.tint);
            bytes[i * stride..i * stride + size].copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        gpu.queue.write_buffer(&self.buffer, 0, &bytes);
    }

    fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

/// Buffers and layouts shared by all pass programs.
pub struct PassResources {
    frame_layout: wgpu::BindGroupLayout,
    model_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    models: ModelBuffer,
    default_texture: Texture,
    /// Albedo bind group of each draw, rebuilt by [`prepare`](Self::prepare).
    texture_groups: Vec<wgpu::BindGroup>,
}

impl PassResources {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Albedo Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let stride = model_stride(device.limits().min_uniform_buffer_offset_alignment);
        let models = ModelBuffer::new(device, &model_layout, stride, 64);

        Self {
            frame_layout,
            model_layout,
            texture_layout,
            frame_buffer,
            frame_bind_group,
            models,
            default_texture: Texture::white(gpu),
            texture_groups: Vec::new(),
        }
    }

    /// Uploads this frame's uniforms and builds the draws' texture bind
    /// groups. Runs once per frame before the first pass.
    pub fn prepare(
        &mut self,
        gpu: &GpuContext,
        params: &FrameParams,
        clear_color: [f32; 4],
        draws: &[GpuDraw<'_>],
    ) {
        let uniforms = FrameUniforms::new(params, clear_color);
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.models.write(gpu, &self.model_layout, draws);

        self.texture_groups = draws
            .iter()
            .map(|draw| {
                let texture = draw.texture.unwrap_or(&self.default_texture);
                self.texture_bind_group(gpu, texture)
            })
            .collect();
    }

    fn texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Albedo Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }
}

/// Formats of the attachments a pass renders into.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputLayout {
    pub colors: Vec<wgpu::TextureFormat>,
    pub depth: bool,
}

impl OutputLayout {
    pub fn of_target(target: &OffscreenTarget) -> Self {
        Self {
            colors: target
                .colors()
                .iter()
                .map(|color| color.format.to_wgpu())
                .collect(),
            depth: target.has_depth(),
        }
    }

    /// The swapchain surface plus the renderer's display depth buffer.
    pub fn display(format: wgpu::TextureFormat) -> Self {
        Self {
            colors: vec![format],
            depth: true,
        }
    }

    fn color_targets(&self) -> Vec<Option<wgpu::ColorTargetState>> {
        self.colors
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect()
    }
}

/// Views a pass renders into.
#[derive(Clone)]
pub struct OutputViews<'a> {
    pub colors: Vec<&'a wgpu::TextureView>,
    pub depth: Option<&'a wgpu::TextureView>,
}

impl<'a> OutputViews<'a> {
    pub fn of_target(target: &'a OffscreenTarget) -> Self {
        Self {
            colors: target.colors().iter().map(|color| &color.view).collect(),
            depth: target.depth().ok().map(|depth| &depth.view),
        }
    }

    fn color_attachments(&self, clear: wgpu::Color) -> Vec<Option<wgpu::RenderPassColorAttachment<'a>>> {
        self.colors
            .iter()
            .map(|&view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect()
    }

    fn depth_attachment(&self) -> Option<wgpu::RenderPassDepthStencilAttachment<'a>> {
        self.depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        })
    }
}

/// Everything a program needs to record a pass, besides the graph's inputs
/// and output.
pub struct RenderContext<'a> {
    pub gpu: &'a GpuContext,
    pub resources: &'a PassResources,
    pub params: &'a FrameParams,
    pub draws: &'a [GpuDraw<'a>],
    pub clear_color: [f32; 4],
    /// Where passes that write the display render to.
    pub display: OutputViews<'a>,
}

impl RenderContext<'_> {
    fn clear(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color.map(f64::from);
        wgpu::Color { r, g, b, a }
    }
}

/// The pipelines of one pass.
pub enum PassProgram {
    Scene(ScenePass),
    Lighting(LightingPass),
    PostProcess(PostProcessPass),
}

impl PassProgram {
    pub fn new(
        gpu: &GpuContext,
        resources: &PassResources,
        pass: &PassDesc,
        output: &OutputLayout,
    ) -> Self {
        log::info!("building '{}' pipelines ({:?})", pass.name, pass.program);
        match pass.program {
            Program::Forward | Program::Geometry | Program::Shadow => {
                PassProgram::Scene(ScenePass::new(gpu, resources, pass, output))
            }
            Program::Lighting => PassProgram::Lighting(LightingPass::new(gpu, resources, pass, output)),
            Program::PostProcess => {
                PassProgram::PostProcess(PostProcessPass::new(gpu, resources, pass, output))
            }
        }
    }

    /// Records the pass into `encoder`.
    pub fn record(
        &self,
        ctx: &RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        io: &mut PassIo<'_, OffscreenTarget>,
    ) -> Result<(), GraphError> {
        match self {
            PassProgram::Scene(pass) => pass.record(ctx, encoder, io),
            PassProgram::Lighting(pass) => pass.record(ctx, encoder, io),
            PassProgram::PostProcess(pass) => pass.record(ctx, encoder, io),
        }
    }
}

/// The pass's target views, or the display's when the pass writes the display.
fn output_views<'a>(
    io: &'a mut PassIo<'_, OffscreenTarget>,
    display: &OutputViews<'a>,
) -> OutputViews<'a> {
    match io.output() {
        Some(target) => OutputViews::of_target(target),
        None => display.clone(),
    }
}

/// The view of the attachment bound at `unit`.
fn input_view<'a>(
    io: &PassIo<'a, OffscreenTarget>,
    unit: u32,
) -> Result<&'a wgpu::TextureView, GraphError> {
    let input = io.input(unit)?;
    let target: &'a OffscreenTarget = input.target;
    let view = match input.attachment {
        Attachment::Color(index) => &target.color(index)?.view,
        Attachment::Depth => &target.depth()?.view,
    };
    Ok(view)
}

fn shader(gpu: &GpuContext, label: &str, source: &'static str) -> wgpu::ShaderModule {
    gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// A scene pass whose output has no depth buffer.
fn missing_depth(pass: &str) -> GraphError {
    GraphError::InvalidOutput {
        pass: pass.to_string(),
        output: TargetError::MissingDepth.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 256);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 144);
    }

    #[test]
    fn model_stride_respects_offset_alignment() {
        assert_eq!(model_stride(256), 256);
        assert_eq!(model_stride(64), 192);
        assert_eq!(model_stride(0), 144);
    }

    #[test]
    fn frame_uniforms_carry_clamped_params() {
        let mut params = FrameParams::default();
        params.post.radius = 400;
        params.material.kd = 3.0;
        params.time = 1.5;
        let uniforms = FrameUniforms::new(&params, [0.0; 4]);
        assert_eq!(uniforms.post[0], 25.0);
        assert_eq!(uniforms.material[1], 1.0);
        assert_eq!(uniforms.camera_pos[3], 1.5);
        let to_light = Vec3::from_slice(&uniforms.to_light);
        assert!(to_light.abs_diff_eq(params.light.to_light(), 1e-6));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniforms = ModelUniforms::new(model, Vec4::ONE);
        let normal = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!(n.abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-6));
    }
}
