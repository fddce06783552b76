use std::fmt;
use std::sync::Arc;

use dog_futures::{channel, BoxFuture, Executor, Future, Outcome};
use tracing::debug;

use crate::runnable::{launch, Runnable};
use crate::stop::RunSignals;

/// A runnable rebound onto another executor.
///
/// `run` submits the start of the inner run to `executor` and forwards its
/// outcome, so an inline solver becomes a concurrent `Parallel` branch when
/// dispatched onto a pool.
pub struct Dispatched<R> {
    inner: Arc<R>,
    executor: Arc<dyn Executor>,
    signals: RunSignals,
}

impl<R: Runnable> Dispatched<R> {
    pub fn new(inner: R, executor: Arc<dyn Executor>) -> Self {
        Self {
            inner: Arc::new(inner),
            executor,
            signals: RunSignals::new(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Runnable> Runnable for Dispatched<R> {
    type Input = R::Input;
    type Output = R::Output;

    fn run(&self, input: R::Input) -> BoxFuture<R::Output> {
        let (promise, future) = channel();
        let inner = self.inner.clone();
        let signal = self.signals.begin();
        debug!("Dispatching {} on {}", inner.name(), self.executor.name());
        // A task dropped unrun drops the promise, which resolves as abandoned.
        self.executor.execute(Box::new(move || {
            launch(&*inner, input, &signal)
                .on_done(Box::new(move |outcome: &Outcome<R::Output>| promise.resolve(outcome.clone())));
        }));
        Box::new(future)
    }

    fn stop(&self) {
        self.signals.raise_all();
        self.inner.stop();
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

impl<R> fmt::Debug for Dispatched<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("executor", &self.executor.name())
            .finish()
    }
}
