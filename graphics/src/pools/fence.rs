//! Fence pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Fence;

/// Recycles fences. Fences are interchangeable, so there is a single bucket.
pub struct FencePool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<(), Fence>,
}

impl FencePool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("FencePool", settings.live_threshold),
        }
    }

    /// Returns an unsignaled fence, reusing an idle one when possible.
    pub fn request_fence(&mut self) -> Result<Arc<Fence>, GraphicsError> {
        if let Some(fence) = self.pool.take(&()) {
            fence.reset()?;
            return Ok(fence);
        }
        self.device.create_fence(false)
    }

    /// Like [`request_fence`](Self::request_fence), but the fence returns to
    /// the pool automatically at the next flush.
    pub fn request_transient_fence(&mut self) -> Result<Arc<Fence>, GraphicsError> {
        let fence = self.request_fence()?;
        self.pool.mark_transient((), Arc::clone(&fence));
        Ok(fence)
    }

    /// Hands a fence back for reuse.
    pub fn return_fence(&mut self, fence: Arc<Fence>) {
        self.pool.put((), fence);
    }

    /// Underlying bucket storage.
    pub fn buckets(&self) -> &BucketPool<(), Fence> {
        &self.pool
    }
}

impl ResourcePool for FencePool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("FencePool::update");
        self.pool.update(|_| {});
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}
