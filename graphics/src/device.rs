//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources.
//! It wraps a [`GpuBackend`], hands out reference-counted resource wrappers
//! and keeps weak references to them for live-resource accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::backend::{GpuBackend, create_backend};
use crate::error::GraphicsError;
use crate::resources::{
    Buffer, CommandContext, Fence, PipelineStatistics, ResourceId, Texture, Timestamp,
};
use crate::types::{BufferDescriptor, TextureDescriptor, TextureType};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
/// All resource creation methods use interior mutability where needed.
///
/// # Example
///
/// ```ignore
/// let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)?;
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Rgba8Unorm,
///     TextureUsage::RENDER_ATTACHMENT,
/// ))?;
/// ```
pub struct GraphicsDevice {
    backend: Arc<dyn GpuBackend>,
    capabilities: DeviceCapabilities,
    next_resource_id: AtomicU64,
    // Track allocated resources (weak references for accounting/debugging)
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
    fences: RwLock<Vec<Weak<Fence>>>,
}

impl GraphicsDevice {
    /// Create a device on top of `backend` with default capabilities.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        Self::with_capabilities(backend, DeviceCapabilities::default())
    }

    /// Create a device with explicit capabilities.
    pub fn with_capabilities(
        backend: Arc<dyn GpuBackend>,
        capabilities: DeviceCapabilities,
    ) -> Arc<Self> {
        log::info!("Creating graphics device on {}", backend.name());
        Arc::new(Self {
            backend,
            capabilities,
            next_resource_id: AtomicU64::new(1),
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
            fences: RwLock::new(Vec::new()),
        })
    }

    /// Create a device on the default backend.
    pub fn create_default() -> Result<Arc<Self>, GraphicsError> {
        Ok(Self::new(create_backend()?))
    }

    /// Get the backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the backend name.
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn next_id(&self) -> ResourceId {
        ResourceId::new(self.next_resource_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a GPU buffer, optionally filled with `initial_data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size exceeds device limits or allocation fails.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let handle = self.backend.create_buffer(descriptor, initial_data)?;
        let buffer = Arc::new(Buffer::new(
            self.next_id(),
            handle,
            Arc::clone(&self.backend),
            Arc::downgrade(self),
            descriptor.clone(),
        ));

        track(&self.buffers, &buffer);

        log::trace!(
            "GraphicsDevice: created buffer {} {:?}, size={}",
            buffer.id(),
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a GPU buffer initialized from a slice of plain-old-data values.
    pub fn create_buffer_init<T: bytemuck::Pod>(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        contents: &[T],
    ) -> Result<Arc<Buffer>, GraphicsError> {
        self.create_buffer(descriptor, Some(bytemuck::cast_slice(contents)))
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the texture dimensions exceed device limits or allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.size.width > max_dim
            || descriptor.size.height > max_dim
            || descriptor.size.depth > max_dim
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }

        if descriptor.size.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        if descriptor.texture_type == TextureType::Cube && descriptor.size.depth != 6 {
            return Err(GraphicsError::InvalidParameter(format!(
                "cube textures need 6 layers, got {}",
                descriptor.size.depth
            )));
        }

        let handle = self.backend.create_texture(descriptor)?;
        let texture = Arc::new(Texture::new(
            self.next_id(),
            handle,
            Arc::clone(self),
            descriptor.clone(),
        ));

        track(&self.textures, &texture);

        log::trace!(
            "GraphicsDevice: created texture {} {:?}, size={}x{}x{}",
            texture.id(),
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );

        Ok(texture)
    }

    /// Create a fence, optionally already signaled.
    pub fn create_fence(self: &Arc<Self>, signaled: bool) -> Result<Arc<Fence>, GraphicsError> {
        let handle = self.backend.create_fence(signaled)?;
        let fence = Arc::new(Fence::new(
            self.next_id(),
            handle,
            Arc::clone(&self.backend),
            Arc::downgrade(self),
        ));

        track(&self.fences, &fence);

        Ok(fence)
    }

    /// Create a timestamp query.
    pub fn create_timestamp(self: &Arc<Self>) -> Result<Arc<Timestamp>, GraphicsError> {
        let handle = self.backend.create_timestamp()?;
        Ok(Arc::new(Timestamp::new(
            self.next_id(),
            handle,
            Arc::clone(&self.backend),
        )))
    }

    /// Create a pipeline-statistics query.
    pub fn create_pipeline_statistics(
        self: &Arc<Self>,
    ) -> Result<Arc<PipelineStatistics>, GraphicsError> {
        let handle = self.backend.create_pipeline_statistics()?;
        Ok(Arc::new(PipelineStatistics::new(
            self.next_id(),
            handle,
            Arc::clone(&self.backend),
        )))
    }

    /// Create a standalone command context.
    pub fn create_command_context(self: &Arc<Self>) -> Result<Arc<CommandContext>, GraphicsError> {
        let handle = self.backend.allocate_command_buffer()?;
        log::trace!("GraphicsDevice: created command context {handle:?}");
        Ok(Arc::new(CommandContext::new(
            self.next_id(),
            handle,
            Arc::clone(&self.backend),
        )))
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.backend.wait_idle()
    }

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .map(|b| b.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .map(|t| t.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live fences created by this device.
    pub fn fence_count(&self) -> usize {
        self.fences
            .read()
            .map(|f| f.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Number of tracked weak references, dead ones included.
    pub fn tracked_resource_count(&self) -> usize {
        self.buffers.read().map(|b| b.len()).unwrap_or(0)
            + self.textures.read().map(|t| t.len()).unwrap_or(0)
            + self.fences.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        prune(&self.buffers);
        prune(&self.textures);
        prune(&self.fences);
    }
}

/// Weak references tracked before a creation prunes the dead ones.
const TRACKING_PRUNE_THRESHOLD: usize = 256;

fn track<T>(list: &RwLock<Vec<Weak<T>>>, resource: &Arc<T>) {
    if let Ok(mut list) = list.write() {
        // Prune at every power of two so the cost stays amortized.
        if list.len() >= TRACKING_PRUNE_THRESHOLD && list.len().is_power_of_two() {
            list.retain(|w| w.strong_count() > 0);
        }
        list.push(Arc::downgrade(resource));
    }
}

fn prune<T>(list: &RwLock<Vec<Weak<T>>>) {
    if let Ok(mut list) = list.write() {
        list.retain(|w| w.strong_count() > 0);
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("backend", &self.backend.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::{BufferUsage, Extent3d, TextureFormat, TextureUsage};

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_device_name() {
        let device = create_test_device();
        assert_eq!(device.name(), "Dummy Backend");
    }

    #[test]
    fn test_create_buffer() {
        let device = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(device.buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let device = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_buffer_init() {
        let device = create_test_device();
        let data = [1.0f32, 2.0, 3.0, 4.0];
        let buffer = device
            .create_buffer_init(&BufferDescriptor::new(16, BufferUsage::VERTEX), &data)
            .unwrap();
        assert_eq!(buffer.size(), 16);

        let too_small = device.create_buffer_init(&BufferDescriptor::new(8, BufferUsage::VERTEX), &data);
        assert!(matches!(too_small, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_texture() {
        let device = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                512,
                512,
                TextureFormat::Rgba8Unorm,
                TextureUsage::TEXTURE_BINDING,
            ))
            .unwrap();
        assert_eq!(texture.width(), 512);
        assert_eq!(texture.height(), 512);
        assert_eq!(device.texture_count(), 1);
    }

    #[test]
    fn test_create_texture_zero_size() {
        let device = create_test_device();
        let result = device.create_texture(&TextureDescriptor::new_2d(
            0,
            512,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_cube_requires_six_layers() {
        let device = create_test_device();
        let result = device.create_texture(&TextureDescriptor::new(
            TextureType::Cube,
            Extent3d::new_3d(64, 64, 4),
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        ));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_resource_ids_are_unique() {
        let device = create_test_device();
        let a = device.create_fence(true).unwrap();
        let b = device.create_fence(true).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(device.fence_count(), 2);
    }

    #[test]
    fn test_resource_cleanup() {
        let device = create_test_device();
        {
            let _buffer = device
                .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)
                .unwrap();
            assert_eq!(device.buffer_count(), 1);
        }
        device.cleanup_dead_resources();
        assert_eq!(device.buffer_count(), 0);
        assert_eq!(device.tracked_resource_count(), 0);
    }

    #[test]
    fn test_tracking_is_pruned_during_creation() {
        let device = create_test_device();
        let keep = device.create_fence(true).unwrap();
        for _ in 0..10_000 {
            device.create_fence(false).unwrap();
        }
        assert_eq!(device.fence_count(), 1);
        assert!(device.tracked_resource_count() <= 2 * TRACKING_PRUNE_THRESHOLD);
        drop(keep);
    }
}
