//! Command context pool.

use std::sync::Arc;

use super::bucket::BucketPool;
use super::{PoolSettings, ResourcePool};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::CommandContext;

/// Recycles standalone command contexts.
///
/// [`begin_context`](Self::begin_context) hands out a context that is
/// already recording; [`end_context`](Self::end_context) ends it, submits
/// the commands and puts the context back.
pub struct ContextPool {
    device: Arc<GraphicsDevice>,
    pool: BucketPool<(), CommandContext>,
}

impl ContextPool {
    pub fn new(device: Arc<GraphicsDevice>, settings: &PoolSettings) -> Self {
        Self {
            device,
            pool: BucketPool::new("ContextPool", settings.live_threshold),
        }
    }

    pub fn request_context(&mut self) -> Result<Arc<CommandContext>, GraphicsError> {
        match self.pool.take(&()) {
            Some(context) => Ok(context),
            None => self.device.create_command_context(),
        }
    }

    pub fn request_transient_context(&mut self) -> Result<Arc<CommandContext>, GraphicsError> {
        let context = self.request_context()?;
        self.pool.mark_transient((), Arc::clone(&context));
        Ok(context)
    }

    pub fn return_context(&mut self, context: Arc<CommandContext>) {
        if context.is_recording() {
            log::warn!("ContextPool: context {} returned while recording", context.id());
        }
        self.pool.put((), context);
    }

    /// Takes a context and starts recording into it.
    pub fn begin_context(&mut self) -> Result<Arc<CommandContext>, GraphicsError> {
        let context = self.request_context()?;
        if let Err(e) = context.begin() {
            self.pool.put((), context);
            return Err(e);
        }
        Ok(context)
    }

    /// Ends recording, submits what was recorded and returns the context to
    /// the pool. The context goes back even if ending or submitting fails.
    pub fn end_context(&mut self, context: Arc<CommandContext>) -> Result<(), GraphicsError> {
        lumen_core::profile_function!();
        let result = match context.end() {
            Ok(true) => context.submit(),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };
        self.pool.put((), context);
        result
    }

    pub fn buckets(&self) -> &BucketPool<(), CommandContext> {
        &self.pool
    }
}

impl ResourcePool for ContextPool {
    fn name(&self) -> &'static str {
        self.pool.name()
    }

    fn flush_transient(&mut self) {
        self.pool.flush_transient();
    }

    fn update(&mut self) {
        lumen_core::profile_scope!("ContextPool::update");
        self.pool.update(|_| {});
    }

    fn release_all(&mut self) {
        self.pool.release_all(|_| {});
    }

    fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{BackendCall, DummyBackend, ObjectKind};

    fn pool(threshold: u64) -> (Arc<DummyBackend>, ContextPool) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let pool = ContextPool::new(device, &PoolSettings::default().with_live_threshold(threshold));
        (backend, pool)
    }

    #[test]
    fn end_context_submits_and_recycles() {
        let (backend, mut pool) = pool(10);
        let ctx = pool.begin_context().unwrap();
        let handle = ctx.handle();
        assert!(ctx.is_recording());

        pool.end_context(ctx).unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(
            backend.take_calls(),
            vec![
                BackendCall::BeginCommands(handle),
                BackendCall::EndCommands(handle),
                BackendCall::Submit(crate::backend::SubmitInfo {
                    command_buffer: handle,
                    wait_semaphore: None,
                    signal_semaphore: None,
                    fence: None,
                }),
            ]
        );

        let again = pool.begin_context().unwrap();
        assert_eq!(again.handle(), handle);
        assert_eq!(backend.created_count(ObjectKind::CommandBuffer), 1);
    }

    #[test]
    fn ending_an_idle_context_submits_nothing() {
        let (backend, mut pool) = pool(10);
        let ctx = pool.request_context().unwrap();
        pool.end_context(ctx).unwrap();
        assert!(
            !backend
                .take_calls()
                .iter()
                .any(|c| matches!(c, BackendCall::Submit(_)))
        );
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn transient_contexts_return_then_expire() {
        let (backend, mut pool) = pool(2);
        let a = pool.request_transient_context().unwrap();
        let b = pool.request_transient_context().unwrap();
        assert_ne!(a.id(), b.id());
        drop((a, b));

        pool.update();
        assert_eq!(pool.idle_count(), 2);
        pool.update();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(backend.live_count(ObjectKind::CommandBuffer), 0);
    }
}
