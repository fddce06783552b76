use std::fmt;
use std::sync::Arc;

use dog_futures::{channel, BoxFuture, Future, FutureError, Outcome, Promise};
use tracing::debug;

use crate::error::WorkflowError;
use crate::runnable::{launch, Runnable};
use crate::stop::{RunSignals, StopSignal};

/// Feeds a runnable's output back into it.
///
/// Stops after `max_iter` iterations, or earlier when stopped, in which
/// case it resolves with the latest state rather than a failure. That holds
/// when the stop interrupts an iteration too: a body that answers the stop
/// with `Stopped` leaves the state of the last finished iteration. Any other
/// failing iteration resolves the loop with that failure.
pub struct Loop<R> {
    body: Arc<R>,
    max_iter: Option<usize>,
    signals: RunSignals,
}

impl<R, S> Loop<R>
where
    R: Runnable<Input = S, Output = S>,
    S: Clone + Send + Sync + 'static,
{
    /// Loop until stopped.
    pub fn new(body: R) -> Self {
        Self {
            body: Arc::new(body),
            max_iter: None,
            signals: RunSignals::new(),
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }
}

struct Iteration<R, S> {
    body: Arc<R>,
    max_iter: Option<usize>,
    signal: StopSignal,
    promise: Promise<S>,
}

impl<R, S> Iteration<R, S>
where
    R: Runnable<Input = S, Output = S>,
    S: Clone + Send + Sync + 'static,
{
    /// Run iterations until one is still pending, then resume from its
    /// completion. Iterations that finish synchronously never grow the stack.
    fn drive(mut self, mut state: S, mut count: usize) {
        loop {
            if self.max_iter.map_or(false, |max| count >= max) {
                return self.promise.set_value(state);
            }
            if self.signal.is_raised() {
                debug!("Loop over {} stopped after {} iterations", self.body.name(), count);
                return self.promise.set_value(state);
            }

            let future = launch(&*self.body, state.clone(), &self.signal);
            if !future.done() {
                future.on_done(Box::new(move |outcome: &Outcome<S>| {
                    if let Some((this, next)) = self.settle(state, outcome) {
                        this.drive(next, count + 1);
                    }
                }));
                return;
            }

            let outcome = future.result().map_err(FutureError::into_failure);
            match self.settle(state, &outcome) {
                Some((this, next)) => {
                    self = this;
                    state = next;
                    count += 1;
                }
                None => return,
            }
        }
    }

    /// Hand back the next state, or resolve the loop and return `None`.
    fn settle(self, state: S, outcome: &Outcome<S>) -> Option<(Self, S)> {
        match outcome {
            Ok(next) => Some((self, next.clone())),
            Err(failure) if self.signal.is_raised() && WorkflowError::is_stopped(failure) => {
                debug!("Loop over {} stopped inside an iteration", self.body.name());
                self.promise.set_value(state);
                None
            }
            Err(failure) => {
                self.promise.resolve(Err(failure.clone()));
                None
            }
        }
    }
}

impl<R, S> Runnable for Loop<R>
where
    R: Runnable<Input = S, Output = S>,
    S: Clone + Send + Sync + 'static,
{
    type Input = S;
    type Output = S;

    fn run(&self, input: S) -> BoxFuture<S> {
        let (promise, future) = channel();
        let iteration = Iteration {
            body: self.body.clone(),
            max_iter: self.max_iter,
            signal: self.signals.begin(),
            promise,
        };
        iteration.drive(input, 0);
        Box::new(future)
    }

    fn stop(&self) {
        self.signals.raise_all();
        self.body.stop();
    }

    fn name(&self) -> String {
        format!("Loop({})", self.body.name())
    }
}

impl<R> fmt::Debug for Loop<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loop")
            .field("max_iter", &self.max_iter)
            .field("in_flight", &self.signals.in_flight())
            .finish()
    }
}
