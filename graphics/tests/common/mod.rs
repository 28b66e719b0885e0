//! Shared setup for the pool and viewport integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use lumen_graphics::backend::dummy::DummyBackend;
use lumen_graphics::{
    GraphicsDevice, PoolSettings, RenderPools, ViewportSettings, WindowViewport,
};

/// Initializes logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A dummy backend, a device on top of it and a registry of pools.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub device: Arc<GraphicsDevice>,
    pub pools: RenderPools,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(PoolSettings::default())
    }

    pub fn with_settings(settings: PoolSettings) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let pools = RenderPools::new(Arc::clone(&device), settings);
        Self {
            backend,
            device,
            pools,
        }
    }

    /// Runs `count` pool updates.
    pub fn tick(&mut self, count: u64) {
        for _ in 0..count {
            self.pools.update_all();
        }
    }

    /// Creates a window viewport on a fresh surface and clears the call log.
    pub fn window_viewport(&self, settings: ViewportSettings) -> WindowViewport {
        let surface = self.backend.create_surface();
        let viewport = WindowViewport::new(Arc::clone(&self.device), surface, settings)
            .expect("viewport creation");
        self.backend.take_calls();
        viewport
    }
}
