//! Device-level surface (texture) pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::key::{ReverseIndex, SurfaceKey};
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{Extent3d, TextureDescriptor, TextureFormat, TextureType, TextureUsage};

/// Recycles raw GPU textures keyed by type, format, size and usage.
///
/// Requested usage is widened with [`TextureFormat::implied_usage`], so a
/// pooled surface can always be sampled and rendered to.
pub struct SurfacePool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<SurfaceKey, Texture>,
    reverse: ReverseIndex<SurfaceKey, Texture>,
}

impl SurfacePool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("SurfacePool", settings.live_threshold),
            reverse: ReverseIndex::new(),
        }
    }

    fn descriptor(
        texture_type: TextureType,
        format: TextureFormat,
        size: Extent3d,
        usage: TextureUsage,
    ) -> Result<(SurfaceKey, TextureDescriptor), GraphicsError> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot pool a zero-sized surface ({}x{}x{})",
                size.width, size.height, size.depth
            )));
        }
        let usage = usage | format.implied_usage();
        let key = SurfaceKey::new(texture_type, format, size, usage)?;
        Ok((key, TextureDescriptor::new(texture_type, size, format, usage)))
    }

    /// Returns a 2D surface.
    ///
    /// Zero-sized requests fail with [`GraphicsError::InvalidParameter`]
    /// without touching the device or the pool.
    pub fn request_surface(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        usage: TextureUsage,
    ) -> Result<Arc<Texture>, GraphicsError> {
        self.request_surface_typed(
            TextureType::D2,
            format,
            Extent3d::new_2d(width, height),
            usage,
        )
    }

    /// Returns a surface of any dimensionality.
    pub fn request_surface_typed(
        &mut self,
        texture_type: TextureType,
        format: TextureFormat,
        size: Extent3d,
        usage: TextureUsage,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let (key, descriptor) = Self::descriptor(texture_type, format, size, usage)?;
        self.acquire(key, &descriptor)
    }

    /// Like [`request_surface`](Self::request_surface), but the surface
    /// returns to the pool automatically at the next flush.
    pub fn request_transient_surface(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        usage: TextureUsage,
    ) -> Result<Arc<Texture>, GraphicsError> {
        self.request_transient_surface_typed(
            TextureType::D2,
            format,
            Extent3d::new_2d(width, height),
            usage,
        )
    }

    /// Transient variant of [`request_surface_typed`](Self::request_surface_typed).
    pub fn request_transient_surface_typed(
        &mut self,
        texture_type: TextureType,
        format: TextureFormat,
        size: Extent3d,
        usage: TextureUsage,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let (key, descriptor) = Self::descriptor(texture_type, format, size, usage)?;
        let texture = self.acquire(key, &descriptor)?;
        self.pool.mark_transient(key, Arc::clone(&texture));
        Ok(texture)
    }

    fn acquire(
        &mut self,
        key: SurfaceKey,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        if let Some(texture) = self.pool.take(&key) {
            return Ok(texture);
        }

        let texture = self.device.create_texture(descriptor)?;
        self.reverse.insert(&texture, key);
        Ok(texture)
    }

    /// Hands a surface back for reuse. Returns `false` (and drops the
    /// reference) if the surface did not come from this pool.
    pub fn return_surface(&mut self, texture: Arc<Texture>) -> bool {
        match self.reverse.get(texture.id()) {
            Some(key) => {
                self.pool.put(key, texture);
                true
            }
            None => {
                log::debug!("SurfacePool: ignoring return of unknown texture {}", texture.id());
                false
            }
        }
    }

    /// Number of surfaces the reverse index still tracks.
    pub fn tracked_count(&self) -> usize {
        self.reverse.len()
    }

    /// Underlying bucket storage.
    pub fn buckets(&self) -> &BucketPool<SurfaceKey, Texture> {
        &self.pool
    }
}

impl ResourcePool for SurfacePool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("SurfacePool::update");
        let reverse = &mut self.reverse;
        self.pool.update(|texture| {
            reverse.remove(texture.id());
        });
        let dropped = self.reverse.prune_dropped();
        if dropped > 0 {
            log::debug!("SurfacePool: forgot {dropped} checkouts that were never returned");
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
