//! Background execution of tile fetches.
//!
//! The loader never blocks on I/O: it hands closures to a [`TaskExecutor`] and
//! keeps the returned [`TaskHandle`]s so it can cancel them when the view
//! moves on. [`WorkerPool`] is the production executor, backed by the blocking
//! thread pool of a dedicated tokio runtime.

use std::fmt;
use std::thread;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ExecutorError;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a submitted task.
pub trait TaskHandle: Send + Sync {
    /// Request cancellation. A task that has not started yet will not run;
    /// a running task is left to finish.
    fn cancel(&self);

    fn is_finished(&self) -> bool;
}

/// Something that can run [`Task`]s in the background.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: Task) -> Box<dyn TaskHandle>;
}

impl TaskHandle for JoinHandle<()> {
    fn cancel(&self) {
        self.abort();
    }

    fn is_finished(&self) -> bool {
        JoinHandle::is_finished(self)
    }
}

// =============================================================================
// WorkerPool
// =============================================================================

/// Fixed-size pool of blocking worker threads.
///
/// Dropping the pool stops accepting work; tasks already running are allowed
/// to finish on their threads.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool running at most `threads` tasks concurrently.
    pub fn new(threads: usize) -> Result<Self, ExecutorError> {
        if threads == 0 {
            return Err(ExecutorError::NoThreads);
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("tile-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        debug!(threads, "Started tile worker pool");

        Ok(Self {
            runtime: Some(runtime),
            handle,
            threads,
        })
    }

    /// Create a pool sized to the machine's available parallelism.
    pub fn with_available_parallelism() -> Result<Self, ExecutorError> {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl TaskExecutor for WorkerPool {
    fn submit(&self, task: Task) -> Box<dyn TaskHandle> {
        Box::new(self.handle.spawn_blocking(task))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}
