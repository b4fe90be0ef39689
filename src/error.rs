//! Error types for skeleton solving, render targets, graph validation and GPU setup.
//!
//! Each concern gets its own enum so callers can tell a malformed skeleton apart
//! from an incomplete framebuffer or a device that failed to start. [`Error`]
//! wraps all of them for code that just wants to propagate with `?`.

use thiserror::Error;

use crate::skeleton::NodeId;
use crate::target::TargetId;

/// Structural problems in a skeleton's parent/child links.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    /// The node id does not belong to this skeleton.
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// A node names a parent index that is not in the arena.
    #[error("node {child:?} references missing parent {parent:?}")]
    MissingParent { child: NodeId, parent: NodeId },

    /// Walking the ancestor chain never reached a root.
    #[error("cycle detected in the ancestor chain of node {0:?}")]
    Cycle(NodeId),

    /// Nodes have a single parent; re-parenting is not supported.
    #[error("node {child:?} already has parent {parent:?}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    /// A solve order must be a permutation of the node set.
    #[error("solve order must list each of the {expected} nodes exactly once")]
    InvalidSolveOrder { expected: usize },
}

/// Render target completeness and lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("target '{label}' has no attachments")]
    NoAttachments { label: String },

    #[error("target '{label}' has zero size ({width}x{height})")]
    ZeroSize {
        label: String,
        width: u32,
        height: u32,
    },

    #[error("target '{label}' is {width}x{height}, above the device maximum of {max}")]
    TooLarge {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("target '{label}' declares {count} color attachments, device allows {max}")]
    TooManyColorAttachments {
        label: String,
        count: usize,
        max: usize,
    },

    #[error("target '{label}' needs {bytes} color bytes per sample, device allows {max}")]
    TooManyColorBytes { label: String, bytes: u32, max: u32 },

    #[error("attachment {index} requested but the target has {count} color attachments")]
    AttachmentOutOfRange { index: usize, count: usize },

    #[error("target has no depth attachment")]
    MissingDepth,

    #[error("target {0:?} does not exist")]
    UnknownTarget(TargetId),
}

/// Render graph validation and execution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("render graph has no passes")]
    Empty,

    #[error("pass '{pass}' writes the display but is not the last pass")]
    DisplayNotLast { pass: String },

    #[error("last pass '{pass}' must write the display")]
    NoDisplayOutput { pass: String },

    #[error("pass '{pass}' reads target '{target}' before any earlier pass writes it")]
    ReadBeforeWrite { pass: String, target: String },

    #[error("pass '{pass}' reads its own output target '{target}'")]
    ReadsOwnOutput { pass: String, target: String },

    #[error("target '{target}' is written by both '{first}' and '{second}'")]
    MultipleWriters {
        target: String,
        first: String,
        second: String,
    },

    #[error("pass '{pass}' binds texture unit {unit} twice")]
    DuplicateUnit { pass: String, unit: u32 },

    #[error("pass '{pass}' reads {attachment} of '{target}', which does not exist")]
    MissingAttachment {
        pass: String,
        target: String,
        attachment: String,
    },

    #[error("pass '{pass}' references undeclared target {target:?}")]
    UnknownTarget { pass: String, target: TargetId },

    #[error("pass '{pass}' has nothing bound at texture unit {unit}")]
    UnboundInput { pass: String, unit: u32 },

    #[error("pass '{pass}' read target '{target}' before it was written this frame")]
    StaleRead { pass: String, target: String },

    #[error("pass '{pass}' cannot write to {output}")]
    InvalidOutput { pass: String, output: String },

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Fatal failures while bringing up the GPU.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Crate-wide error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error("surface frame unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("texture load failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
