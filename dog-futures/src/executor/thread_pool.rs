use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

use super::{Executor, Task};
use crate::config::{FlowConfig, ThreadPoolConfig};

static THREAD_POOL: OnceCell<Arc<ThreadPoolExecutor>> = OnceCell::new();

/// Shared process-wide thread pool executor, started on first use.
///
/// Sized from the environment (see `ThreadPoolConfig`). A failed start is
/// returned and retried by the next call.
pub fn try_thread_executor() -> std::io::Result<Arc<ThreadPoolExecutor>> {
    THREAD_POOL
        .get_or_try_init(|| {
            let config = ThreadPoolConfig::from_config(&FlowConfig::from_env().snapshot());
            ThreadPoolExecutor::new(config).map(Arc::new)
        })
        .cloned()
}

/// Shared process-wide thread pool executor.
///
/// # Panics
///
/// Panics if the pool cannot be started on first use, for example when the
/// OS refuses to spawn its threads. Use `try_thread_executor` to handle
/// that case.
pub fn thread_executor() -> Arc<ThreadPoolExecutor> {
    match try_thread_executor() {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to start shared thread pool executor: {e}"),
    }
}

#[derive(Debug)]
enum Backend {
    Owned(Runtime),
    Borrowed(Handle),
}

/// Executor that runs callables on a pool of worker threads.
///
/// The pool is the blocking pool of a tokio runtime, either owned by the
/// executor or borrowed from an application that already runs one.
#[derive(Debug)]
pub struct ThreadPoolExecutor {
    backend: Backend,
    config: ThreadPoolConfig,
}

impl ThreadPoolExecutor {
    /// Start a dedicated pool with `config.max_workers` threads.
    pub fn new(config: ThreadPoolConfig) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_workers.max(1))
            .thread_name(config.thread_name.clone())
            .build()?;

        info!(
            "Started thread pool executor '{}' with {} workers",
            config.thread_name, config.max_workers
        );

        Ok(Self {
            backend: Backend::Owned(runtime),
            config,
        })
    }

    /// Start a dedicated pool with `max_workers` threads.
    pub fn with_workers(max_workers: usize) -> std::io::Result<Self> {
        Self::new(ThreadPoolConfig {
            max_workers,
            ..ThreadPoolConfig::default()
        })
    }

    /// Run on the blocking pool of an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            backend: Backend::Borrowed(handle),
            config: ThreadPoolConfig::default(),
        }
    }

    pub fn config(&self) -> &ThreadPoolConfig {
        &self.config
    }

    fn handle(&self) -> &Handle {
        match &self.backend {
            Backend::Owned(runtime) => runtime.handle(),
            Backend::Borrowed(handle) => handle,
        }
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) {
        debug!("Dispatching task to thread pool '{}'", self.config.thread_name);
        // The join handle is not needed: the task resolves its own promise,
        // and a task dropped unrun resolves it as abandoned.
        drop(self.handle().spawn_blocking(task));
    }

    fn name(&self) -> &'static str {
        "thread_pool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorExt;
    use crate::future::Future;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_runs_off_caller_thread() {
        let executor = ThreadPoolExecutor::with_workers(2).unwrap();
        let caller = thread::current().id();

        let f = executor.submit(move || Ok(thread::current().id() != caller));
        assert!(f.result().unwrap());
    }

    #[test]
    fn test_submit_returns_before_completion() {
        let executor = ThreadPoolExecutor::with_workers(1).unwrap();
        let f = executor.submit(|| {
            thread::sleep(Duration::from_millis(100));
            Ok(1)
        });
        assert!(!f.done());
        assert_eq!(f.result().unwrap(), 1);
        assert!(f.done());
    }

    #[test]
    fn test_tasks_overlap() {
        let executor = ThreadPoolExecutor::with_workers(4).unwrap();
        let start = Instant::now();

        let futures: Vec<_> = (0..4)
            .map(|i| {
                executor.submit(move || {
                    thread::sleep(Duration::from_millis(200));
                    Ok(i)
                })
            })
            .collect();
        let results: Vec<i32> = futures.iter().map(|f| f.result().unwrap()).collect();

        assert_eq!(results, vec![0, 1, 2, 3]);
        assert!(start.elapsed() < Duration::from_millis(700));
    }

    #[test]
    fn test_panic_is_captured() {
        let executor = ThreadPoolExecutor::with_workers(1).unwrap();
        let f = executor.submit::<(), _>(|| panic!("worker blew up"));
        let failure = f.result().unwrap_err().into_failure();
        assert!(failure.is::<crate::error::Panicked>());
    }

    #[test]
    fn test_shared_pool_is_reused() {
        let first = try_thread_executor().unwrap();
        let second = thread_executor();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.submit(|| Ok(5)).result().unwrap(), 5);
    }

    #[test]
    fn test_from_handle() {
        let runtime = Builder::new_multi_thread().worker_threads(1).build().unwrap();
        let executor = ThreadPoolExecutor::from_handle(runtime.handle().clone());
        let f = executor.submit(|| Ok("borrowed"));
        assert_eq!(f.result().unwrap(), "borrowed");
    }
}
