//! Timestamp query pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Timestamp;

/// Recycles GPU timestamp queries. Queries are interchangeable, so there is
/// a single bucket.
pub struct TimestampPool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<(), Timestamp>,
}

impl TimestampPool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("TimestampPool", settings.live_threshold),
        }
    }

    pub fn request_timestamp(&mut self) -> Result<Arc<Timestamp>, GraphicsError> {
        match self.pool.take(&()) {
            Some(timestamp) => Ok(timestamp),
            None => self.device.create_timestamp(),
        }
    }

    pub fn request_transient_timestamp(&mut self) -> Result<Arc<Timestamp>, GraphicsError> {
        let timestamp = self.request_timestamp()?;
        self.pool.mark_transient((), Arc::clone(&timestamp));
        Ok(timestamp)
    }

    pub fn return_timestamp(&mut self, timestamp: Arc<Timestamp>) {
        self.pool.put((), timestamp);
    }

    pub fn buckets(&self) -> &BucketPool<(), Timestamp> {
        &self.pool
    }
}

impl ResourcePool for TimestampPool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("TimestampPool::update");
        self.pool.update(|_| {});
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}
