//! GPU timestamp query.

use std::sync::Arc;

use super::ResourceId;
use crate::backend::{GpuBackend, GpuHandle};

/// A single GPU timestamp query slot.
pub struct Timestamp {
    id: ResourceId,
    handle: GpuHandle,
    backend: Arc<dyn GpuBackend>,
}

impl Timestamp {
    pub(crate) fn new(id: ResourceId, handle: GpuHandle, backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            id,
            handle,
            backend,
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
}

impl Drop for Timestamp {
    fn drop(&mut self) {
        self.backend.destroy_timestamp(self.handle);
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timestamp").field("id", &self.id).finish()
    }
}

static_assertions::assert_impl_all!(Timestamp: Send, Sync);
