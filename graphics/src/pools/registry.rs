//! The set of pools owned by one device, and its per-tick driver.

use std::sync::Arc;

use lumen_core::render_thread::RenderThread;
use lumen_core::tickable::Tickable;
use parking_lot::Mutex;

use super::{
    BufferPool, ContextPool, FencePool, PipelineStatisticsPool, PoolSettings, RenderSurfacePool,
    ResourcePool, SurfacePool, TimestampPool,
};
use crate::device::GraphicsDevice;

/// One pool of each kind, sharing a device and settings.
pub struct RenderPools {
    pub fences: FencePool,
    pub buffers: BufferPool,
    pub surfaces: SurfacePool,
    pub render_surfaces: RenderSurfacePool,
    pub timestamps: TimestampPool,
    pub pipeline_statistics: PipelineStatisticsPool,
    pub contexts: ContextPool,
    device: Arc<GraphicsDevice>,
    settings: PoolSettings,
}

/// Pools shared between the tick driver and the render thread.
pub type SharedPools = Arc<Mutex<RenderPools>>;

impl RenderPools {
    pub fn new(device: Arc<GraphicsDevice>, settings: PoolSettings) -> Self {
        Self {
            fences: FencePool::new(Arc::clone(&device), &settings),
            buffers: BufferPool::new(Arc::clone(&device), &settings),
            surfaces: SurfacePool::new(Arc::clone(&device), &settings),
            render_surfaces: RenderSurfacePool::new(Arc::clone(&device), &settings),
            timestamps: TimestampPool::new(Arc::clone(&device), &settings),
            pipeline_statistics: PipelineStatisticsPool::new(Arc::clone(&device), &settings),
            contexts: ContextPool::new(Arc::clone(&device), &settings),
            device,
            settings,
        }
    }

    /// Wraps the pools for sharing with the render thread.
    pub fn into_shared(self) -> SharedPools {
        Arc::new(Mutex::new(self))
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Updates the device-level pools: surfaces, buffers, fences, queries
    /// and contexts. Also drops the device's bookkeeping for resources the
    /// pools evicted.
    pub fn update_device_pools(&mut self) {
        lumen_core::profile_function!();
        self.surfaces.update();
        self.buffers.update();
        self.fences.update();
        self.timestamps.update();
        self.pipeline_statistics.update();
        self.contexts.update();
        self.device.cleanup_dead_resources();
    }

    /// Updates every pool, render surfaces first.
    pub fn update_all(&mut self) {
        self.render_surfaces.update();
        self.update_device_pools();
        lumen_core::profile_plot!("Pools: idle resources", self.idle_count());
        self.plot_stats();
    }

    fn plot_stats(&self) {
        use crate::profiling::plot_pool_stats;
        plot_pool_stats("fences", self.fences.buckets().stats());
        plot_pool_stats("buffers", self.buffers.buckets().stats());
        plot_pool_stats("surfaces", self.surfaces.buckets().stats());
        plot_pool_stats("render_surfaces", self.render_surfaces.buckets().stats());
        plot_pool_stats("timestamps", self.timestamps.buckets().stats());
        plot_pool_stats(
            "pipeline_statistics",
            self.pipeline_statistics.buckets().stats(),
        );
        plot_pool_stats("contexts", self.contexts.buckets().stats());
    }

    /// Releases every idle resource in every pool. Safe to call repeatedly.
    pub fn release_all(&mut self) {
        self.render_surfaces.release_all();
        self.surfaces.release_all();
        self.buffers.release_all();
        self.fences.release_all();
        self.timestamps.release_all();
        self.pipeline_statistics.release_all();
        self.contexts.release_all();
        self.device.cleanup_dead_resources();
    }

    /// Total idle resources across pools.
    pub fn idle_count(&self) -> usize {
        self.render_surfaces.idle_count()
            + self.surfaces.idle_count()
            + self.buffers.idle_count()
            + self.fences.idle_count()
            + self.timestamps.idle_count()
            + self.pipeline_statistics.idle_count()
            + self.contexts.idle_count()
    }
}

impl std::fmt::Debug for RenderPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPools")
            .field("fences", &self.fences.idle_count())
            .field("buffers", &self.buffers.idle_count())
            .field("surfaces", &self.surfaces.idle_count())
            .field("render_surfaces", &self.render_surfaces.idle_count())
            .field("timestamps", &self.timestamps.idle_count())
            .field("pipeline_statistics", &self.pipeline_statistics.idle_count())
            .field("contexts", &self.contexts.idle_count())
            .finish()
    }
}

/// Drives pool updates from the tick loop.
///
/// Render surfaces are updated on the ticking thread; device pools are
/// updated by a task queued on the render thread, behind any frame work
/// already queued there.
pub struct PoolTicker {
    pools: SharedPools,
    render_thread: Arc<RenderThread>,
}

impl PoolTicker {
    pub fn new(pools: SharedPools, render_thread: Arc<RenderThread>) -> Self {
        Self {
            pools,
            render_thread,
        }
    }
}

impl Tickable for PoolTicker {
    fn name(&self) -> &str {
        "RenderPools"
    }

    fn tick(&mut self, _delta_seconds: f32) {
        self.pools.lock().render_surfaces.update();

        let pools = Arc::clone(&self.pools);
        if let Err(e) = self
            .render_thread
            .call(move || pools.lock().update_device_pools())
        {
            log::error!("Failed to schedule pool update: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::{BufferUsage, Extent2d, TextureFormat, TextureUsage};
    use lumen_core::tickable::TickableRegistry;

    fn pools(threshold: u64) -> RenderPools {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        RenderPools::new(device, PoolSettings::default().with_live_threshold(threshold))
    }

    #[test]
    fn update_all_flushes_every_pool() {
        let mut pools = pools(10);
        let _ = pools.fences.request_transient_fence().unwrap();
        let _ = pools.buffers.request_transient_buffer(64, BufferUsage::UNIFORM).unwrap();
        let _ = pools
            .surfaces
            .request_transient_surface(TextureFormat::Rgba8Unorm, 16, 16, TextureUsage::empty())
            .unwrap();
        let _ = pools
            .render_surfaces
            .request_transient_render_surface(TextureFormat::Rgba8Unorm, Extent2d::new(16, 16))
            .unwrap();
        let _ = pools.timestamps.request_transient_timestamp().unwrap();
        let _ = pools.pipeline_statistics.request_transient_statistics().unwrap();
        let _ = pools.contexts.request_transient_context().unwrap();

        pools.update_all();
        assert_eq!(pools.idle_count(), 7);
    }

    #[test]
    fn release_all_empties_every_pool_twice() {
        let mut pools = pools(10);
        let buffer = pools.buffers.request_buffer(64, BufferUsage::UNIFORM).unwrap();
        pools.buffers.return_buffer(buffer);
        let _ = pools.fences.request_transient_fence().unwrap();
        let stats = pools.pipeline_statistics.request_statistics().unwrap();
        pools.pipeline_statistics.return_statistics(stats);
        let ctx = pools.contexts.begin_context().unwrap();
        pools.contexts.end_context(ctx).unwrap();

        pools.release_all();
        assert_eq!(pools.idle_count(), 0);
        assert_eq!(pools.device().buffer_count(), 0);
        assert_eq!(pools.device().fence_count(), 0);

        pools.release_all();
        assert_eq!(pools.idle_count(), 0);
    }

    #[test]
    fn churn_does_not_grow_device_tracking() {
        let mut pools = pools(1);
        for _ in 0..1000 {
            pools.buffers.request_transient_buffer(64, BufferUsage::UNIFORM).unwrap();
            pools
                .surfaces
                .request_transient_surface(TextureFormat::Rgba8Unorm, 16, 16, TextureUsage::empty())
                .unwrap();
            pools.update_all();
            pools.update_all();
        }
        assert_eq!(pools.device().buffer_count(), 0);
        assert_eq!(pools.device().texture_count(), 0);
        assert_eq!(pools.device().tracked_resource_count(), 0);
    }

    #[test]
    fn ticker_updates_pools_on_render_thread() {
        let shared = pools(1).into_shared();
        let render_thread = Arc::new(RenderThread::spawn().unwrap());
        {
            let mut pools = shared.lock();
            let buffer = pools.buffers.request_buffer(64, BufferUsage::UNIFORM).unwrap();
            pools.buffers.return_buffer(buffer);
            let surface = pools
                .render_surfaces
                .request_render_surface(TextureFormat::Rgba8Unorm, Extent2d::new(4, 4))
                .unwrap();
            pools.render_surfaces.return_render_surface(surface);
        }

        let mut registry = TickableRegistry::new();
        registry.register(Box::new(PoolTicker::new(
            Arc::clone(&shared),
            Arc::clone(&render_thread),
        )));
        registry.tick(1.0 / 60.0);
        render_thread.wait().unwrap();

        assert_eq!(shared.lock().idle_count(), 0);
    }
}
