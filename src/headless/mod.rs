//! CPU reference backend.
//!
//! Implements every pass program on plain float images and drives them
//! through the same [`RenderGraph`](crate::render_graph::RenderGraph) the
//! wgpu renderer uses. It needs no GPU, so pass ordering, target wiring and
//! the post effects can be checked by reading pixels back in tests.
//!
//! ```
//! use rigpass::headless::HeadlessRenderer;
//! use rigpass::scene::Draw;
//! use rigpass::target::Extent;
//! use rigpass::{FrameParams, Mat4, MeshData, RendererConfig};
//!
//! let mut renderer = HeadlessRenderer::new(&RendererConfig::default(), Extent::new(64, 48))?;
//! let cube = MeshData::cube();
//! let image = renderer.render(&FrameParams::default(), &[Draw::new(&cube, Mat4::IDENTITY)])?;
//! assert_eq!(image.width(), 64);
//! # Ok::<(), rigpass::Error>(())
//! ```

mod buffers;
pub mod effects;
mod programs;
pub mod raster;
mod renderer;

pub use buffers::{DepthImage, HeadlessFactory, Image, ImageTarget};
pub use programs::{blinn_phong, shadow_factor};
pub use renderer::HeadlessRenderer;
