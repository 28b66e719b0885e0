//! CPU-GPU synchronization fence.

use std::sync::{Arc, Weak};

use super::ResourceId;
use crate::backend::{GpuBackend, GpuHandle};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
}

/// CPU-GPU synchronization primitive.
///
/// Fences allow the CPU to wait for GPU work to complete. Pass
/// [`Fence::handle`] to a submission; the GPU signals it when the work
/// finishes.
///
/// # Example
///
/// ```ignore
/// let fence = pools.fences.request()?;
/// backend.submit(&SubmitInfo { fence: Some(fence.handle()), .. })?;
///
/// // Later, before reusing frame resources:
/// fence.wait()?;
/// assert_eq!(fence.status(), FenceStatus::Signaled);
/// ```
pub struct Fence {
    id: ResourceId,
    handle: GpuHandle,
    backend: Arc<dyn GpuBackend>,
    device: Weak<GraphicsDevice>,
}

impl Fence {
    pub(crate) fn new(
        id: ResourceId,
        handle: GpuHandle,
        backend: Arc<dyn GpuBackend>,
        device: Weak<GraphicsDevice>,
    ) -> Self {
        Self {
            id,
            handle,
            backend,
            device,
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

    /// Check the current status of the fence.
    pub fn status(&self) -> FenceStatus {
        if self.backend.is_fence_signaled(self.handle) {
            FenceStatus::Signaled
        } else {
            FenceStatus::Unsignaled
        }
    }

    /// Check if the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == FenceStatus::Signaled
    }

    /// Wait for the fence to be signaled (blocking).
    ///
    /// Returns immediately if already signaled.
    pub fn wait(&self) -> Result<(), GraphicsError> {
        self.backend.wait_fence(self.handle)
    }

    /// Reset the fence to unsignaled state.
    ///
    /// Must only be called when no GPU work is pending on this fence.
    pub fn reset(&self) -> Result<(), GraphicsError> {
        self.backend.reset_fence(self.handle)
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        self.backend.destroy_fence(self.handle);
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .finish()
    }
}

static_assertions::assert_impl_all!(Fence: Send, Sync);
