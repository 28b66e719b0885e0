//! Engine-level render surfaces and their pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::bucket::{BucketPool, PooledResource};
use super::key::BucketKey;
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{ResourceId, Texture};
use crate::types::{Extent2d, TextureDescriptor, TextureFormat};

static NEXT_SURFACE_SERIAL: AtomicU64 = AtomicU64::new(0);

/// A 2D texture that renderers draw into and viewports blit from.
pub struct RenderSurface {
    texture: Arc<Texture>,
    size: Extent2d,
}

impl RenderSurface {
    /// Creates a render surface with format-derived usage.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        format: TextureFormat,
        size: Extent2d,
    ) -> Result<Arc<Self>, GraphicsError> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "render surface size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }

        let mut descriptor =
            TextureDescriptor::new_2d(size.width, size.height, format, format.implied_usage());
        if cfg!(debug_assertions) {
            let serial = NEXT_SURFACE_SERIAL.fetch_add(1, Ordering::Relaxed);
            descriptor = descriptor.with_label(format!("RenderSurface.{serial}"));
        }

        let texture = device.create_texture(&descriptor)?;
        Ok(Arc::new(Self { texture, size }))
    }

    /// Backing texture.
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn format(&self) -> TextureFormat {
        self.texture.format()
    }

    pub fn size(&self) -> Extent2d {
        self.size
    }

    pub fn id(&self) -> ResourceId {
        self.texture.id()
    }
}

impl PooledResource for RenderSurface {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("id", &self.id())
            .field("format", &self.format())
            .field("size", &self.size)
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderSurface: Send, Sync);

/// Recycles [`RenderSurface`]s keyed by format and size.
///
/// The key is recomputed from the surface on return, so no reverse index is
/// needed.
pub struct RenderSurfacePool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<BucketKey, RenderSurface>,
}

impl RenderSurfacePool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("RenderSurfacePool", settings.live_threshold),
        }
    }

    fn key(format: TextureFormat, size: Extent2d) -> Result<BucketKey, GraphicsError> {
        BucketKey::surface(format, size.width, size.height, Default::default())
    }

    /// Returns a render surface.
    ///
    /// Zero-sized requests fail with [`GraphicsError::InvalidParameter`].
    pub fn request_render_surface(
        &mut self,
        format: TextureFormat,
        size: Extent2d,
    ) -> Result<Arc<RenderSurface>, GraphicsError> {
        let key = Self::key(format, size)?;
        self.acquire(key, format, size)
    }

    /// Like [`request_render_surface`](Self::request_render_surface), but the
    /// surface returns to the pool automatically at the next flush.
    pub fn request_transient_render_surface(
        &mut self,
        format: TextureFormat,
        size: Extent2d,
    ) -> Result<Arc<RenderSurface>, GraphicsError> {
        let key = Self::key(format, size)?;
        let surface = self.acquire(key, format, size)?;
        self.pool.mark_transient(key, Arc::clone(&surface));
        Ok(surface)
    }

    fn acquire(
        &mut self,
        key: BucketKey,
        format: TextureFormat,
        size: Extent2d,
    ) -> Result<Arc<RenderSurface>, GraphicsError> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot pool a zero-sized render surface ({}x{})",
                size.width, size.height
            )));
        }
        if let Some(surface) = self.pool.take(&key) {
            return Ok(surface);
        }
        RenderSurface::new(&self.device, format, size)
    }

    /// Hands a render surface back for reuse.
    pub fn return_render_surface(&mut self, surface: Arc<RenderSurface>) {
        match Self::key(surface.format(), surface.size()) {
            Ok(key) => self.pool.put(key, surface),
            Err(e) => log::debug!("RenderSurfacePool: dropping unpoolable surface: {e}"),
        }
    }

    /// Underlying bucket storage.
    pub fn buckets(&self) -> &BucketPool<BucketKey, RenderSurface> {
        &self.pool
    }
}

impl ResourcePool for RenderSurfacePool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("RenderSurfacePool::update");
        self.pool.update(|_| {});
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}
