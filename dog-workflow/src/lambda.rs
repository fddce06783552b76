use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dog_futures::{BoxFuture, Executor, ExecutorExt, Failure, ImmediateExecutor};
use tracing::debug;

use crate::error::WorkflowError;
use crate::runnable::Runnable;
use crate::stop::{RunSignals, StopSignal};

type LambdaFn<I, O> = dyn Fn(I, &StopSignal) -> anyhow::Result<O> + Send + Sync;

/// Leaf runnable built from a closure.
///
/// The closure receives the input and the stop signal of its run, so long
/// computations can poll `is_raised` or wait with `StopSignal::sleep`.
/// Runs on the immediate executor unless rebound with `with_executor`.
pub struct Lambda<I, O = I> {
    name: String,
    func: Arc<LambdaFn<I, O>>,
    executor: Arc<dyn Executor>,
    signals: RunSignals,
}

impl<I, O> Lambda<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Self::with_stop(move |input, _| func(input))
    }

    /// Build from a closure that also watches the stop signal.
    pub fn with_stop<F>(func: F) -> Self
    where
        F: Fn(I, &StopSignal) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Self {
            name: "Lambda".to_string(),
            func: Arc::new(func),
            executor: ImmediateExecutor::shared(),
            signals: RunSignals::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }
}

impl<I, O> Runnable for Lambda<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn run(&self, input: I) -> BoxFuture<O> {
        let func = self.func.clone();
        let signal = self.signals.begin();
        let name = self.name.clone();
        self.executor.submit_outcome(move || {
            if signal.is_raised() {
                debug!("{} stopped before start", name);
                return Err(WorkflowError::Stopped.into());
            }
            func(input, &signal).map_err(Failure::from)
        })
    }

    fn stop(&self) {
        self.signals.raise_all();
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl<I, O> fmt::Debug for Lambda<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("name", &self.name)
            .field("executor", &self.executor.name())
            .finish()
    }
}

/// Passes its input through unchanged.
#[derive(Debug)]
pub struct Identity<S> {
    _state: PhantomData<fn() -> S>,
}

impl<S> Identity<S> {
    pub fn new() -> Self {
        Self { _state: PhantomData }
    }
}

impl<S> Default for Identity<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Runnable for Identity<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Input = S;
    type Output = S;

    fn run(&self, input: S) -> BoxFuture<S> {
        Box::new(dog_futures::Present::value(input))
    }
}
