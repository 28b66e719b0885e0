//! Recordable command context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::ResourceId;
use crate::backend::{GpuBackend, GpuHandle, SubmitInfo};
use crate::error::GraphicsError;

/// A command buffer that can be recorded and submitted on its own, outside
/// any viewport frame. Used for uploads, readbacks and compute work.
///
/// ```ignore
/// let ctx = pools.contexts.begin_context()?;
/// // ... record into ctx.handle() ...
/// pools.contexts.end_context(ctx)?; // submitted and back in the pool
/// ```
pub struct CommandContext {
    id: ResourceId,
    handle: GpuHandle,
    backend: Arc<dyn GpuBackend>,
    recording: AtomicBool,
}

impl CommandContext {
    pub(crate) fn new(id: ResourceId, handle: GpuHandle, backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            id,
            handle,
            backend,
            recording: AtomicBool::new(false),
        }
    }

    /// Device-unique identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Command buffer handle commands are recorded into.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Returns true between [`begin`](Self::begin) and [`end`](Self::end).
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Resets the command buffer and starts recording.
    pub fn begin(&self) -> Result<(), GraphicsError> {
        if self.recording.swap(true, Ordering::AcqRel) {
            return Err(GraphicsError::InvalidState(format!(
                "context {} is already recording",
                self.id
            )));
        }
        if let Err(e) = self.backend.begin_commands(self.handle) {
            self.recording.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    /// Stops recording. Returns `false` if the context was not recording,
    /// in which case there is nothing to submit.
    pub fn end(&self) -> Result<bool, GraphicsError> {
        if !self.recording.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        self.backend.end_commands(self.handle)?;
        Ok(true)
    }

    /// Submits the recorded commands without synchronization.
    pub(crate) fn submit(&self) -> Result<(), GraphicsError> {
        self.backend.submit(&SubmitInfo {
            command_buffer: self.handle,
            wait_semaphore: None,
            signal_semaphore: None,
            fence: None,
        })
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        self.backend.free_command_buffer(self.handle);
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("id", &self.id)
            .field("recording", &self.is_recording())
            .finish()
    }
}

static_assertions::assert_impl_all!(CommandContext: Send, Sync);
