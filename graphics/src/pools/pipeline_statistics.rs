//! Pipeline-statistics query pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::PipelineStatistics;

/// Recycles pipeline-statistics queries. Like timestamps they are
/// interchangeable and share one bucket.
pub struct PipelineStatisticsPool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<(), PipelineStatistics>,
}

impl PipelineStatisticsPool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("PipelineStatisticsPool", settings.live_threshold),
        }
    }

    pub fn request_statistics(&mut self) -> Result<Arc<PipelineStatistics>, GraphicsError> {
        match self.pool.take(&()) {
            Some(statistics) => Ok(statistics),
            None => self.device.create_pipeline_statistics(),
        }
    }

    pub fn request_transient_statistics(
        &mut self,
    ) -> Result<Arc<PipelineStatistics>, GraphicsError> {
        let statistics = self.request_statistics()?;
        self.pool.mark_transient((), Arc::clone(&statistics));
        Ok(statistics)
    }

    pub fn return_statistics(&mut self, statistics: Arc<PipelineStatistics>) {
        self.pool.put((), statistics);
    }

    pub fn buckets(&self) -> &BucketPool<(), PipelineStatistics> {
        &self.pool
    }
}

impl ResourcePool for PipelineStatisticsPool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("PipelineStatisticsPool::update");
        self.pool.update(|_| {});
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyBackend, ObjectKind};

    #[test]
    fn statistics_are_recycled_then_evicted() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let mut pool =
            PipelineStatisticsPool::new(device, &PoolSettings::default().with_live_threshold(2));

        let query = pool.request_statistics().unwrap();
        let id = query.id();
        pool.return_statistics(query);
        let query = pool.request_statistics().unwrap();
        assert_eq!(query.id(), id);
        pool.return_statistics(query);

        pool.update();
        assert_eq!(backend.live_count(ObjectKind::PipelineStatistics), 1);
        pool.update();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(backend.live_count(ObjectKind::PipelineStatistics), 0);
        assert_eq!(backend.created_count(ObjectKind::PipelineStatistics), 1);
    }

    #[test]
    fn allocation_failure_propagates() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let mut pool = PipelineStatisticsPool::new(device, &PoolSettings::default());
        backend.fail_next_allocations(1);

        assert_eq!(
            pool.request_statistics().unwrap_err(),
            GraphicsError::OutOfMemory
        );
        assert!(pool.request_statistics().is_ok());
    }
}
