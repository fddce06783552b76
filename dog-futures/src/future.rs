use std::time::Duration;

use crate::error::{FutureError, Outcome};

/// Callback invoked once with the outcome of a resolved future.
pub type DoneCallback<T> = Box<dyn FnOnce(&Outcome<T>) + Send + 'static>;

/// Boxed future, as returned by executors and runnables.
pub type BoxFuture<T> = Box<dyn Future<T>>;

/// Single-assignment container for the eventual outcome of a computation.
///
/// A future is either pending, resolved with a value, or resolved with a
/// failure. It moves out of pending at most once and never back.
pub trait Future<T>: Send + Sync {
    /// Whether the future has resolved. Never blocks.
    fn done(&self) -> bool;

    /// Block until resolved, or until `timeout` elapses when one is given.
    ///
    /// Returns the stored value, the stored failure, or
    /// `FutureError::Timeout`. Timing out does not affect the computation;
    /// a later call can still observe its outcome.
    fn wait(&self, timeout: Option<Duration>) -> Result<T, FutureError>;

    /// Register a callback to run with the outcome once resolved.
    ///
    /// Runs immediately on the calling thread if already resolved, otherwise
    /// on whichever thread resolves the future.
    fn on_done(&self, callback: DoneCallback<T>);

    /// Block until resolved and return the outcome.
    fn result(&self) -> Result<T, FutureError> {
        self.wait(None)
    }

    /// Block for at most `timeout`.
    fn result_timeout(&self, timeout: Duration) -> Result<T, FutureError> {
        self.wait(Some(timeout))
    }
}

impl<T, F> Future<T> for Box<F>
where
    F: Future<T> + ?Sized,
{
    fn done(&self) -> bool {
        (**self).done()
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<T, FutureError> {
        (**self).wait(timeout)
    }

    fn on_done(&self, callback: DoneCallback<T>) {
        (**self).on_done(callback)
    }
}
