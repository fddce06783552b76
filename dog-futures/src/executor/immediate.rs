use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{capture, Executor, Task};
use crate::present::Present;

static IMMEDIATE: Lazy<Arc<ImmediateExecutor>> = Lazy::new(|| Arc::new(ImmediateExecutor::new()));

/// Shared process-wide immediate executor.
pub fn immediate_executor() -> &'static ImmediateExecutor {
    &IMMEDIATE
}

/// Executor that runs every callable on the calling thread, before
/// `submit` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateExecutor;

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self
    }

    /// The shared instance, for injection as `Arc<dyn Executor>`.
    pub fn shared() -> Arc<dyn Executor> {
        IMMEDIATE.clone()
    }

    /// Run `f` now and wrap its outcome in a `Present`.
    pub fn submit<T, F>(&self, f: F) -> Present<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        Present::from_outcome(capture(f))
    }
}

impl Executor for ImmediateExecutor {
    fn execute(&self, task: Task) {
        task()
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorExt;
    use crate::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(thiserror::Error, Debug)]
    #[error("division by zero")]
    struct DivisionByZero;

    #[test]
    fn test_submit_res() {
        let ie = ImmediateExecutor::new();
        let x = true;
        let f = ie.submit(move || Ok(!x));
        assert!(f.done());
        assert!(!f.result().unwrap());
    }

    #[test]
    fn test_submit_exc() {
        let ie = ImmediateExecutor::new();
        let f = ie.submit::<i32, _>(|| Err(DivisionByZero.into()));
        assert!(f.is_failure());
        assert!(f.result().unwrap_err().failure().unwrap().is::<DivisionByZero>());
    }

    #[test]
    fn test_side_effects_visible_on_return() {
        let ran = AtomicBool::new(false);
        let _ = immediate_executor().submit(|| {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        });
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dyn_submit_is_resolved() {
        let executor = ImmediateExecutor::shared();
        let f = executor.submit(|| Ok("now"));
        assert!(f.done());
        assert_eq!(f.result().unwrap(), "now");
    }

    #[test]
    fn test_shared_instance_is_singleton() {
        assert!(std::ptr::eq(immediate_executor(), immediate_executor()));
    }
}
