//! GPU resources.
//!
//! This module contains the GPU resource types that are created by [`GraphicsDevice`]:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture/image
//! - [`Fence`] - CPU-GPU synchronization fence
//! - [`Timestamp`] - GPU timestamp query
//! - [`PipelineStatistics`] - GPU pipeline-statistics query
//! - [`CommandContext`] - standalone recordable command buffer
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//! The backend object is destroyed when the last reference drops.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod buffer;
mod context;
mod fence;
mod pipeline_statistics;
mod texture;
mod timestamp;

pub use buffer::Buffer;
pub use context::CommandContext;
pub use fence::{Fence, FenceStatus};
pub use pipeline_statistics::PipelineStatistics;
pub use texture::Texture;
pub use timestamp::Timestamp;

use std::fmt;

/// Device-unique identifier of a resource.
///
/// Identifiers are never reused within one device, so they can key side
/// tables (such as a pool's reverse index) without keeping the resource alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
