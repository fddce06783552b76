pub mod immediate;
pub mod thread_pool;

pub use immediate::{immediate_executor, ImmediateExecutor};
pub use thread_pool::{thread_executor, try_thread_executor, ThreadPoolExecutor};

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::deferred;
use crate::error::{Failure, Outcome, Panicked};
use crate::future::BoxFuture;

/// Unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Dispatch mechanism for callables.
///
/// Implementors only decide *where* a task runs. Turning a callable into a
/// future is done once, in `ExecutorExt::submit`, for every executor.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `task`, now or later, on some thread.
    fn execute(&self, task: Task);

    /// Short executor name for logs.
    fn name(&self) -> &'static str;
}

/// Future-returning submission, available on every executor including
/// `dyn Executor`.
pub trait ExecutorExt: Executor {
    /// Submit a callable and get a future for its outcome.
    ///
    /// Failures and panics of the callable are captured into the future;
    /// `submit` itself never fails because of them.
    fn submit<T, F>(&self, f: F) -> BoxFuture<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.submit_outcome(move || capture(f))
    }

    /// Like `submit`, for callables that already produce an `Outcome`.
    ///
    /// Failures returned by `f` are stored as-is, so a failure taken from
    /// another future keeps its identity.
    fn submit_outcome<T, F>(&self, f: F) -> BoxFuture<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let (promise, future) = deferred::channel();
        self.execute(Box::new(move || promise.resolve(capture_outcome(f))));
        Box::new(future)
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}

/// Run a callable on the current thread, turning errors and panics into a
/// `Failure`.
pub fn capture<T, F>(f: F) -> Outcome<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    capture_outcome(move || f().map_err(Failure::from))
}

/// Run a callable producing an `Outcome`, turning panics into a `Failure`.
pub fn capture_outcome<T, F>(f: F) -> Outcome<T>
where
    F: FnOnce() -> Outcome<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let panicked = Panicked::from_payload(payload);
            tracing::error!("Task panicked: {}", panicked.message);
            Err(Failure::new(panicked))
        }
    }
}
