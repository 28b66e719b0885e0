//! Reuse pools for per-frame GPU resources.
//!
//! Renderers ask a pool for a resource, use it, and either hand it back with
//! `return_*` or check it out as transient, in which case the pool takes it
//! back itself at the next [`ResourcePool::update`]. Idle resources survive
//! [`LIVE_THRESHOLD`] updates before they are released.
//!
//! All pools are single-owner and must only be touched from the render
//! thread. [`RenderPools`] bundles one of each and can be shared with the
//! render thread through [`SharedPools`].

mod bucket;
mod buffer;
mod context;
mod fence;
pub mod global;
mod key;
mod pipeline_statistics;
mod registry;
mod render_surface;
mod surface;
mod timestamp;

pub use bucket::{BucketPool, PoolStats, PooledResource};
pub use buffer::{BufferPool, MIN_POOLED_BUFFER_SIZE, pooled_buffer_size};
pub use context::ContextPool;
pub use fence::FencePool;
pub use key::{BucketKey, MAX_KEYED_DIMENSION, ReverseIndex, SurfaceKey};
pub use pipeline_statistics::PipelineStatisticsPool;
pub use registry::{PoolTicker, RenderPools, SharedPools};
pub use render_surface::{RenderSurface, RenderSurfacePool};
pub use surface::SurfacePool;
pub use timestamp::TimestampPool;

use std::ops::{Deref, DerefMut};

/// Number of updates an idle resource survives: three seconds at 60 Hz.
pub const LIVE_THRESHOLD: u64 = 60 * 3;

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Updates an idle resource survives before it is released.
    pub live_threshold: u64,
}

impl PoolSettings {
    pub fn new() -> Self {
        Self {
            live_threshold: LIVE_THRESHOLD,
        }
    }

    /// Set the idle lifetime. Zero is raised to one.
    pub fn with_live_threshold(mut self, live_threshold: u64) -> Self {
        self.live_threshold = live_threshold.max(1);
        self
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame housekeeping shared by every pool.
pub trait ResourcePool {
    /// Pool name used in logs.
    fn name(&self) -> &'static str;

    /// Returns every transient checkout to its bucket.
    fn flush_transient(&mut self);

    /// Flushes transients and evicts idle resources that expired. Call once
    /// per tick.
    fn update(&mut self);

    /// Releases every idle resource. Safe to call repeatedly.
    fn release_all(&mut self);

    /// Number of idle resources held.
    fn idle_count(&self) -> usize;
}

/// Scope guard that flushes a pool's transient checkouts when dropped.
///
/// ```ignore
/// {
///     let mut buffers = TransientScope::new(&mut pools.buffers);
///     let staging = buffers.request_transient_buffer(4096, BufferUsage::COPY_SRC)?;
///     // ...
/// } // staging is back in the pool here
/// ```
pub struct TransientScope<'a, P: ResourcePool> {
    pool: &'a mut P,
}

impl<'a, P: ResourcePool> TransientScope<'a, P> {
    pub fn new(pool: &'a mut P) -> Self {
        Self { pool }
    }
}

impl<P: ResourcePool> Deref for TransientScope<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.pool
    }
}

impl<P: ResourcePool> DerefMut for TransientScope<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.pool
    }
}

impl<P: ResourcePool> Drop for TransientScope<'_, P> {
    fn drop(&mut self) {
        self.pool.flush_transient();
    }
}
