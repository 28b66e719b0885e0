//! Dedicated render thread with a FIFO task queue.
//!
//! Everything that touches GPU objects (pool updates, viewport frames,
//! shutdown) is funnelled through [`RenderThread::call`]. Tasks execute in
//! submission order on a single named thread, so code running inside a task
//! may assume exclusive access to render-thread state.
//!
//! ```text
//!   logic thread                     render thread
//!   ------------                     -------------
//!   call(task A) ──┐
//!   call(task B) ──┼──► mpsc ──►  A() ─► B() ─► barrier()
//!   wait() ────────┘                                │
//!      ▲                                            │
//!      └──────────────── sync_channel ◄─────────────┘
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

/// Type-erased work closure executed on the render thread.
pub type RenderTask = Box<dyn FnOnce() + Send>;

enum RenderCommand {
    Execute(RenderTask),
    Shutdown,
}

thread_local! {
    static IS_RENDER_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Returns `true` when called from inside any [`RenderThread`] worker.
pub fn is_render_thread() -> bool {
    IS_RENDER_THREAD.with(Cell::get)
}

/// Errors produced when talking to the render thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderThreadError {
    /// Spawning the OS thread failed.
    SpawnFailed(String),
    /// The render thread has already exited.
    Disconnected,
    /// `wait` was called from the render thread itself.
    WaitFromRenderThread,
}

impl fmt::Display for RenderThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed(msg) => write!(f, "failed to spawn render thread: {msg}"),
            Self::Disconnected => write!(f, "render thread disconnected"),
            Self::WaitFromRenderThread => write!(f, "cannot wait for the render thread from itself"),
        }
    }
}

impl std::error::Error for RenderThreadError {}

/// Owner of the render thread. Dropping it drains the queue and joins.
pub struct RenderThread {
    sender: mpsc::Sender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl RenderThread {
    /// Spawns the render thread.
    pub fn spawn() -> Result<Self, RenderThreadError> {
        let (sender, receiver) = mpsc::channel::<RenderCommand>();

        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                IS_RENDER_THREAD.with(|flag| flag.set(true));
                crate::set_thread_name!("render");
                log::debug!("Render thread started");

                while let Ok(command) = receiver.recv() {
                    match command {
                        RenderCommand::Execute(task) => task(),
                        RenderCommand::Shutdown => break,
                    }
                }

                log::debug!("Render thread stopped");
            })
            .map_err(|e| RenderThreadError::SpawnFailed(e.to_string()))?;

        let thread_id = handle.thread().id();
        Ok(Self {
            sender,
            handle: Some(handle),
            thread_id,
        })
    }

    /// Enqueues a task. Returns immediately.
    pub fn call<F>(&self, task: F) -> Result<(), RenderThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(RenderCommand::Execute(Box::new(task)))
            .map_err(|_| RenderThreadError::Disconnected)
    }

    /// Blocks until every task enqueued before this call has run.
    pub fn wait(&self) -> Result<(), RenderThreadError> {
        if self.is_current() {
            return Err(RenderThreadError::WaitFromRenderThread);
        }

        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        self.call(move || {
            let _ = done_tx.send(());
        })?;
        done_rx.recv().map_err(|_| RenderThreadError::Disconnected)
    }

    /// Enqueues a task and blocks until it has produced its result.
    pub fn call_and_wait<F, R>(&self, task: F) -> Result<R, RenderThreadError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Err(RenderThreadError::WaitFromRenderThread);
        }

        let (result_tx, result_rx) = mpsc::sync_channel::<R>(1);
        self.call(move || {
            let _ = result_tx.send(task());
        })?;
        result_rx.recv().map_err(|_| RenderThreadError::Disconnected)
    }

    /// Returns `true` if the calling thread is this render thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        let _ = self.sender.send(RenderCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Render thread panicked during shutdown");
        }
    }
}

impl fmt::Debug for RenderThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderThread")
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn tasks_run_in_submission_order() {
        init_logging();
        let thread = RenderThread::spawn().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            thread.call(move || order.lock().unwrap().push(i)).unwrap();
        }
        thread.wait().unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn tasks_run_on_the_render_thread() {
        let thread = RenderThread::spawn().unwrap();
        assert!(!thread.is_current());
        assert!(!is_render_thread());

        let inside = thread.call_and_wait(is_render_thread).unwrap();
        assert!(inside);
    }

    #[test]
    fn call_and_wait_returns_value() {
        let thread = RenderThread::spawn().unwrap();
        assert_eq!(thread.call_and_wait(|| 6 * 7).unwrap(), 42);
    }

    #[test]
    fn drop_drains_pending_tasks() {
        init_logging();
        let counter = Arc::new(Mutex::new(0));
        {
            let thread = RenderThread::spawn().unwrap();
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                thread.call(move || *counter.lock().unwrap() += 1).unwrap();
            }
        }
        assert_eq!(*counter.lock().unwrap(), 10);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            RenderThreadError::Disconnected.to_string(),
            "render thread disconnected"
        );
    }
}
