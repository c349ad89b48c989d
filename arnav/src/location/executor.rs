//! Task executors for location requests.
//!
//! Requests never run on the caller's thread in production: the manager
//! hands each one to an [`Executor`]. [`TokioExecutor`] spawns onto a tokio
//! runtime so requests run concurrently; [`InlineExecutor`] drives the task
//! to completion before returning, which keeps unit tests synchronous.

use tokio::runtime::Handle;

use super::provider::BoxFuture;

/// Runs detached request tasks.
pub trait Executor: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running in.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        // Fire and forget; completion is reported through the request callback
        drop(self.handle.spawn(task));
    }
}

/// Runs each task to completion on the calling thread.
///
/// Tasks must not depend on a tokio reactor.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        futures::executor::block_on(task);
    }
}
