//! Pending futures and their resolving half.
//!
//! `channel()` hands out a `Promise` (write side, used once) and a
//! `Deferred` (read side, clonable). Resolution is guarded by a mutex, so
//! everything the resolving thread did before `resolve` is visible to any
//! thread that observes the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Abandoned, Failure, FutureError, Outcome};
use crate::future::{DoneCallback, Future};

struct SlotState<T> {
    outcome: Option<Arc<Outcome<T>>>,
    callbacks: Vec<DoneCallback<T>>,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    resolved: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                outcome: None,
                callbacks: Vec::new(),
            }),
            resolved: Condvar::new(),
        }
    }

    fn resolve(&self, outcome: Outcome<T>) {
        let outcome = Arc::new(outcome);
        let callbacks = {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                return;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.callbacks)
        };
        self.resolved.notify_all();

        // Callbacks run outside the lock so they may observe this future.
        for callback in callbacks {
            callback(&outcome);
        }
    }

    fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        self.state.lock().outcome.clone()
    }
}

/// Create a connected promise/future pair.
pub fn channel<T>() -> (Promise<T>, Deferred<T>) {
    let slot = Arc::new(Slot::new());
    (
        Promise {
            slot: Some(slot.clone()),
        },
        Deferred { slot },
    )
}

/// Write side of a `Deferred`. Resolving consumes it.
///
/// Dropping an unresolved promise resolves its future with `Abandoned` so
/// that waiters are released.
pub struct Promise<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Promise<T> {
    /// Resolve with an outcome.
    pub fn resolve(mut self, outcome: Outcome<T>) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(outcome);
        }
    }

    pub fn set_value(self, value: T) {
        self.resolve(Ok(value))
    }

    pub fn set_failure(self, failure: impl Into<Failure>) {
        self.resolve(Err(failure.into()))
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(Err(Failure::new(Abandoned)));
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("pending", &self.slot.is_some())
            .finish()
    }
}

/// A future resolved by some other thread through its `Promise`.
pub struct Deferred<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = self.slot.outcome().is_some();
        f.debug_struct("Deferred").field("done", &done).finish()
    }
}

impl<T> Future<T> for Deferred<T>
where
    T: Clone + Send + Sync,
{
    fn done(&self) -> bool {
        self.slot.outcome().is_some()
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<T, FutureError> {
        let deadline = timeout.map(|t| (t, Instant::now() + t));
        let mut state = self.slot.state.lock();

        loop {
            if let Some(outcome) = state.outcome.as_ref() {
                return (**outcome).clone().map_err(FutureError::Failed);
            }
            match deadline {
                Some((timeout, deadline)) => {
                    let waited = self.slot.resolved.wait_until(&mut state, deadline);
                    if waited.timed_out() && state.outcome.is_none() {
                        return Err(FutureError::Timeout(timeout));
                    }
                }
                None => self.slot.resolved.wait(&mut state),
            }
        }
    }

    fn on_done(&self, callback: DoneCallback<T>) {
        let outcome = {
            let mut state = self.slot.state.lock();
            match state.outcome.clone() {
                Some(outcome) => outcome,
                None => {
                    state.callbacks.push(callback);
                    return;
                }
            }
        };
        callback(&outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_pending_until_resolved() {
        let (promise, future) = channel::<i32>();
        assert!(!future.done());

        promise.set_value(5);
        assert!(future.done());
        assert_eq!(future.result().unwrap(), 5);
    }

    #[test]
    fn test_result_blocks_for_other_thread() {
        let (promise, future) = channel::<String>();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            promise.set_value("late".to_string());
        });

        assert_eq!(future.result().unwrap(), "late");
        worker.join().unwrap();
    }

    #[test]
    fn test_timeout_then_later_result() {
        let (promise, future) = channel::<i32>();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            promise.set_value(9);
        });

        let err = future.result_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_timeout());

        assert_eq!(future.result().unwrap(), 9);
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_promise_abandons() {
        let (promise, future) = channel::<i32>();
        drop(promise);

        let err = future.result().unwrap_err();
        assert!(err.failure().unwrap().is::<Abandoned>());
    }

    #[test]
    fn test_callbacks_fire_once() {
        let (promise, future) = channel::<i32>();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        future.on_done(Box::new(move |outcome| {
            assert_eq!(*outcome.as_ref().unwrap(), 3);
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        promise.set_value(3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        future.on_done(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clones_observe_same_outcome() {
        let (promise, future) = channel::<i32>();
        let other = future.clone();
        promise.set_failure(Failure::msg("nope"));

        let a = future.result().unwrap_err().into_failure();
        let b = other.result().unwrap_err().into_failure();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.to_string(), "nope");
    }
}
