//! Buffer pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::key::{BucketKey, ReverseIndex};
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// Smallest buffer the pool hands out.
pub const MIN_POOLED_BUFFER_SIZE: u32 = 16;

/// Size a request for `size` bytes is served with: the next power of two,
/// at least [`MIN_POOLED_BUFFER_SIZE`].
pub fn pooled_buffer_size(size: u32) -> Result<u32, GraphicsError> {
    size.max(MIN_POOLED_BUFFER_SIZE)
        .checked_next_power_of_two()
        .ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("buffer size {size} is too large to pool"))
        })
}

/// Recycles GPU buffers keyed by rounded size and usage.
///
/// Every pooled buffer carries [`BufferUsage::DYNAMIC`].
pub struct BufferPool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<BucketKey, Buffer>,
    reverse: ReverseIndex<BucketKey, Buffer>,
}

impl BufferPool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("BufferPool", settings.live_threshold),
            reverse: ReverseIndex::new(),
        }
    }

    fn key(size: u32, usage: BufferUsage) -> Result<(BucketKey, u32, BufferUsage), GraphicsError> {
        let size = pooled_buffer_size(size)?;
        let usage = usage | BufferUsage::DYNAMIC;
        Ok((BucketKey::buffer(size, usage), size, usage))
    }

    /// Returns a buffer of at least `size` bytes.
    pub fn request_buffer(
        &mut self,
        size: u32,
        usage: BufferUsage,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let (key, size, usage) = Self::key(size, usage)?;
        self.acquire(key, size, usage)
    }

    /// Like [`request_buffer`](Self::request_buffer), but the buffer returns
    /// to the pool automatically at the next flush.
    pub fn request_transient_buffer(
        &mut self,
        size: u32,
        usage: BufferUsage,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let (key, size, usage) = Self::key(size, usage)?;
        let buffer = self.acquire(key, size, usage)?;
        self.pool.mark_transient(key, Arc::clone(&buffer));
        Ok(buffer)
    }

    fn acquire(
        &mut self,
        key: BucketKey,
        size: u32,
        usage: BufferUsage,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        if let Some(buffer) = self.pool.take(&key) {
            return Ok(buffer);
        }

        let descriptor = BufferDescriptor::new(size as u64, usage);
        let buffer = self.device.create_buffer(&descriptor, None)?;
        self.reverse.insert(&buffer, key);
        Ok(buffer)
    }

    /// Hands a buffer back for reuse. Returns `false` (and drops the
    /// reference) if the buffer did not come from this pool.
    pub fn return_buffer(&mut self, buffer: Arc<Buffer>) -> bool {
        match self.reverse.get(buffer.id()) {
            Some(key) => {
                self.pool.put(key, buffer);
                true
            }
            None => {
                log::debug!("BufferPool: ignoring return of unknown buffer {}", buffer.id());
                false
            }
        }
    }

    /// Number of buffers the reverse index still tracks.
    pub fn tracked_count(&self) -> usize {
        self.reverse.len()
    }

    /// Underlying bucket storage.
    pub fn buckets(&self) -> &BucketPool<BucketKey, Buffer> {
        &self.pool
    }
}

impl ResourcePool for BufferPool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("BufferPool::update");
        let reverse = &mut self.reverse;
        self.pool.update(|buffer| {
            reverse.remove(buffer.id());
        });
        let dropped = self.reverse.prune_dropped();
        if dropped > 0 {
            log::debug!("BufferPool: forgot {dropped} checkouts that were never returned");
        }
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
        self.reverse.clear();
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn pool() -> (Arc<GraphicsDevice>, BufferPool) {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let pool = BufferPool::new(Arc::clone(&device), &PoolSettings::default());
        (device, pool)
    }

    #[test]
    fn sizes_round_to_powers_of_two() {
        assert_eq!(pooled_buffer_size(0).unwrap(), 16);
        assert_eq!(pooled_buffer_size(16).unwrap(), 16);
        assert_eq!(pooled_buffer_size(17).unwrap(), 32);
        assert_eq!(pooled_buffer_size(1000).unwrap(), 1024);
        assert!(pooled_buffer_size(u32::MAX).is_err());
    }

    #[test]
    fn similar_sizes_share_a_bucket() {
        let (_device, mut pool) = pool();
        let buffer = pool.request_buffer(100, BufferUsage::UNIFORM).unwrap();
        assert_eq!(buffer.size(), 128);
        assert!(buffer.descriptor().usage.contains(BufferUsage::DYNAMIC));
        let id = buffer.id();

        assert!(pool.return_buffer(buffer));
        let again = pool.request_buffer(120, BufferUsage::UNIFORM).unwrap();
        assert_eq!(again.id(), id);
    }

    #[test]
    fn usage_is_part_of_the_key() {
        let (_device, mut pool) = pool();
        let buffer = pool.request_buffer(64, BufferUsage::UNIFORM).unwrap();
        let id = buffer.id();
        pool.return_buffer(buffer);

        let other = pool.request_buffer(64, BufferUsage::STORAGE).unwrap();
        assert_ne!(other.id(), id);
    }

    #[test]
    fn unknown_buffers_are_ignored() {
        let (device, mut pool) = pool();
        let foreign = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM), None)
            .unwrap();
        assert!(!pool.return_buffer(foreign));
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn eviction_erases_reverse_entries() {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let mut pool = BufferPool::new(
            Arc::clone(&device),
            &PoolSettings::default().with_live_threshold(2),
        );
        let buffer = pool.request_buffer(64, BufferUsage::VERTEX).unwrap();
        pool.return_buffer(buffer);
        assert_eq!(pool.tracked_count(), 1);

        pool.update();
        pool.update();
        assert_eq!(pool.tracked_count(), 0);
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn unreturned_checkouts_are_forgotten_on_update() {
        let (device, mut pool) = pool();
        let kept = pool.request_buffer(64, BufferUsage::VERTEX).unwrap();
        let lost = pool.request_buffer(64, BufferUsage::VERTEX).unwrap();
        assert_eq!(pool.tracked_count(), 2);

        drop(lost);
        pool.update();
        assert_eq!(pool.tracked_count(), 1);
        assert_eq!(device.buffer_count(), 1);
        assert!(pool.return_buffer(kept));
    }

    #[test]
    fn allocation_failure_propagates() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let mut pool = BufferPool::new(device, &PoolSettings::default());
        backend.fail_next_allocations(1);

        assert_eq!(
            pool.request_buffer(64, BufferUsage::VERTEX).unwrap_err(),
            GraphicsError::OutOfMemory
        );
        assert_eq!(pool.tracked_count(), 0);
    }
}
