//! Ordered multi-pass rendering.
//!
//! A render graph is a fixed list of passes. Each pass names the program it
//! runs, the target it writes (or the display), and the textures it samples
//! from targets written earlier in the same frame:
//!
//! ```text
//! Geometry ──▶ gbuffer ─────┐
//! Shadow   ──▶ shadow_map ──┤
//!                           ▼
//!                       Lighting ──▶ lit ──▶ PostProcess ──▶ display
//! ```
//!
//! The graph is backend agnostic: it owns a [`TargetPool`](crate::target::TargetPool)
//! of whatever targets its factory produces and hands each pass its bound
//! inputs and output through [`PassIo`]. The wgpu renderer and the headless
//! renderer drive the same graphs.

pub mod config;
mod graph;
mod pass;

pub use config::PipelineConfig;
pub use graph::{BoundInput, PassIo, RenderGraph, RenderGraphBuilder};
pub use pass::{Attachment, CullMode, PassDesc, PassOutput, Program, TextureRead};
