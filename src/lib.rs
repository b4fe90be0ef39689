//! # rigpass
//!
//! **Forward-kinematics skeletons and a validated multi-pass renderer on wgpu.**
//!
//! Pose a joint hierarchy, turn the solved joints into draws, and render them
//! through an ordered pass sequence: geometry, shadow, lighting,
//! post-process, present. The same render graph drives a wgpu backend for
//! windows and a CPU backend for pixel-exact tests.
//!
//! ## Quick Start
//!
//! ```
//! use rigpass::headless::HeadlessRenderer;
//! use rigpass::scene::{HeadlessDraw, skeleton_draws};
//! use rigpass::target::Extent;
//! use rigpass::{FrameParams, MeshData, Puppet, RendererConfig, Vec4};
//!
//! let mut puppet = Puppet::new();
//! puppet.animate(0.5)?;
//! puppet.skeleton.solve_all()?;
//!
//! let cube = MeshData::cube();
//! let draws: Vec<HeadlessDraw> = skeleton_draws(&puppet.skeleton, &cube, |_| Vec4::ONE);
//!
//! let mut renderer = HeadlessRenderer::new(&RendererConfig::default(), Extent::new(160, 120))?;
//! let image = renderer.render(&FrameParams::default(), &draws)?;
//! assert_eq!((image.width(), image.height()), (160, 120));
//! # Ok::<(), rigpass::Error>(())
//! ```
//!
//! ## Layout
//!
//! - [`skeleton`]: joint arena, FK solving, the puppet rig
//! - [`target`]: offscreen target descriptions, completeness checks, pooling
//! - [`render_graph`]: pass declarations, validation and ordered execution
//! - [`Renderer`]: wgpu pass programs behind a window surface
//! - [`headless`]: the CPU backend

mod camera;
mod config;
mod error;
mod gpu;
pub mod headless;
pub mod logging;
mod mesh;
mod params;
mod passes;
pub mod render_graph;
mod renderer;
pub mod scene;
pub mod skeleton;
pub mod target;
mod texture;
mod transform;

pub use camera::{Camera, Projection};
pub use config::{AppConfig, RendererConfig};
pub use error::{Error, GraphError, InitError, Result, SkeletonError, TargetError};
pub use gpu::GpuContext;
pub use logging::{LoggingConfig, init_logging};
pub use mesh::{Mesh, MeshData, Vertex3d};
pub use params::{FrameParams, Light, Material, PostEffect, PostSettings, ShadowSettings};
pub use render_graph::PipelineConfig;
pub use renderer::Renderer;
pub use skeleton::{Node, NodeId, Puppet, Skeleton};
pub use texture::Texture;
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
