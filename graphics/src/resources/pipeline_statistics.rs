//! GPU pipeline-statistics query.

use std::sync::Arc;

use super::ResourceId;
use crate::backend::{GpuBackend, GpuHandle};

/// A query counting pipeline invocations (vertices, primitives, fragments)
/// over a range of commands.
pub struct PipelineStatistics {
    id: ResourceId,
    handle: GpuHandle,
    backend: Arc<dyn GpuBackend>,
}

impl PipelineStatistics {
    pub(crate) fn new(id: ResourceId, handle: GpuHandle, backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            id,
            handle,
            backend,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }
}

impl Drop for PipelineStatistics {
    fn drop(&mut self) {
        self.backend.destroy_pipeline_statistics(self.handle);
    }
}

impl std::fmt::Debug for PipelineStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStatistics")
            .field("id", &self.id)
            .finish()
    }
}

static_assertions::assert_impl_all!(PipelineStatistics: Send, Sync);
