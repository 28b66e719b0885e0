//! GPU buffer resource.

use std::sync::{Arc, Weak};

use super::ResourceId;
use crate::backend::{GpuBackend, GpuHandle};
use crate::device::GraphicsDevice;
use crate::types::BufferDescriptor;

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and are reference-counted.
/// They hold a weak reference back to their parent device.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)?;
/// println!("Buffer size: {}", buffer.size());
/// ```
pub struct Buffer {
    id: ResourceId,
    handle: GpuHandle,
    backend: Arc<dyn GpuBackend>,
    device: Weak<GraphicsDevice>,
    descriptor: BufferDescriptor,
}

impl Buffer {
    pub(crate) fn new(
        id: ResourceId,
        handle: GpuHandle,
        backend: Arc<dyn GpuBackend>,
        device: Weak<GraphicsDevice>,
        descriptor: BufferDescriptor,
    ) -> Self {
        Self {
            id,
            handle,
            backend,
            device,
            descriptor,
        }
    }

    /// Device-unique identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Backend handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        log::trace!("Destroying buffer {} ({:?})", self.id, self.descriptor.label);
        self.backend.destroy_buffer(self.handle);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);
