//! Offscreen render targets.
//!
//! A [`TargetDesc`] says what a target holds: color attachments with their
//! formats, an optional depth attachment, and whether it follows the surface
//! size. Descriptions are checked for completeness before anything is
//! allocated. A [`TargetPool`] owns the allocated targets and recreates the
//! surface-sized ones on resize.

mod desc;
mod format;
mod offscreen;
mod pool;

pub use desc::{AttachmentSpec, Extent, SizePolicy, TargetDesc, TargetLimits, TargetStatus};
pub use format::{ColorFormat, DEPTH_FORMAT};
pub use offscreen::{ColorAttachment, DepthAttachment, OffscreenTarget};
pub use pool::{TargetFactory, TargetId, TargetInfo, TargetPool};
