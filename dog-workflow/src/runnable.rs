//! The workflow unit contract and its combinator extension methods.

use std::sync::Arc;

use dog_futures::{capture_outcome, BoxFuture, Executor, Present};

use crate::dispatch::Dispatched;
use crate::error::WorkflowError;
use crate::observability::{ObservabilityLayer, Observed};
use crate::sequential::Chain;
use crate::stop::StopSignal;

/// A workflow stage: maps an input state to a future of an output state.
///
/// Implementations must treat their input as read-only. The same input may
/// be handed to several runnables at once by `Parallel`.
pub trait Runnable: Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    /// Start the computation and return a future for its result.
    ///
    /// Failures of the computation are stored in the returned future, never
    /// raised from `run` itself.
    fn run(&self, input: Self::Input) -> BoxFuture<Self::Output>;

    /// Ask a running computation to finish early. Advisory; no-op by default.
    fn stop(&self) {}

    /// Name used in logs and metrics.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Type-erased, shareable runnable.
pub type DynRunnable<I, O = I> = Arc<dyn Runnable<Input = I, Output = O>>;

impl<R> Runnable for Arc<R>
where
    R: Runnable + ?Sized,
{
    type Input = R::Input;
    type Output = R::Output;

    fn run(&self, input: Self::Input) -> BoxFuture<Self::Output> {
        (**self).run(input)
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Combinators available on every runnable.
pub trait RunnableExt: Runnable + Sized {
    /// Feed the output of `self` into `next`.
    fn then<B>(self, next: B) -> Chain<Self, B>
    where
        B: Runnable<Input = Self::Output>,
    {
        Chain::new(self, next)
    }

    /// Run `self` on `executor` instead of wherever it normally runs.
    fn dispatch_on(self, executor: Arc<dyn Executor>) -> Dispatched<Self> {
        Dispatched::new(self, executor)
    }

    /// Report every run of `self` to `layer`.
    fn observed(self, layer: Arc<ObservabilityLayer>) -> Observed<Self> {
        Observed::new(self, layer)
    }

    /// Erase the concrete type.
    fn shared(self) -> DynRunnable<Self::Input, Self::Output> {
        Arc::new(self)
    }
}

impl<R: Runnable> RunnableExt for R {}

/// Start a child runnable on behalf of a composite run holding `signal`.
///
/// A raised signal resolves `Stopped` without starting the child. A panic in
/// the child's `run` becomes a failed future. A stop raised while the child
/// was starting is forwarded to the run it just started.
pub(crate) fn launch<R>(runnable: &R, input: R::Input, signal: &StopSignal) -> BoxFuture<R::Output>
where
    R: Runnable + ?Sized,
{
    if signal.is_raised() {
        return Box::new(Present::failure(WorkflowError::Stopped));
    }
    let future = match capture_outcome(|| Ok(runnable.run(input))) {
        Ok(future) => future,
        Err(failure) => Box::new(Present::failure(failure)) as BoxFuture<R::Output>,
    };
    if signal.is_raised() {
        runnable.stop();
    }
    future
}

/// Strip module paths from a type name, keeping generic arguments readable:
/// `dog_workflow::sequential::Chain<a::A, b::B>` becomes `Chain<A, B>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        match c {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                segment.clear();
                out.push(c);
            }
            _ => segment.push(c),
        }
    }
    out.push_str(&segment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dog_futures::{Future, Present};

    struct Double;

    impl Runnable for Double {
        type Input = i64;
        type Output = i64;

        fn run(&self, input: i64) -> BoxFuture<i64> {
            Box::new(Present::value(input * 2))
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("i64"), "i64");
        assert_eq!(short_type_name("dog_workflow::lambda::Identity<i64>"), "Identity<i64>");
        assert_eq!(
            short_type_name("a::Chain<b::c::X, alloc::sync::Arc<d::Y>>"),
            "Chain<X, Arc<Y>>"
        );
    }

    #[test]
    fn test_default_name() {
        assert_eq!(Double.name(), "Double");
        assert_eq!(Arc::new(Double).name(), "Double");
    }

    struct Exploding;

    impl Runnable for Exploding {
        type Input = i64;
        type Output = i64;

        fn run(&self, _: i64) -> BoxFuture<i64> {
            panic!("solver crashed while starting")
        }
    }

    #[test]
    fn test_launch_turns_panic_into_failure() {
        let failure = launch(&Exploding, 1, &StopSignal::new())
            .result()
            .unwrap_err()
            .into_failure();
        assert!(failure.is::<dog_futures::Panicked>());
    }

    #[test]
    fn test_launch_skips_when_stopped() {
        let signal = StopSignal::new();
        signal.raise();
        let failure = launch(&Exploding, 1, &signal).result().unwrap_err().into_failure();
        assert!(WorkflowError::is_stopped(&failure));
    }

    #[test]
    fn test_dyn_runnable() {
        let r: DynRunnable<i64> = Double.shared();
        assert_eq!(r.run(21).result().unwrap(), 42);
        assert_eq!(r.name(), "Double");
        r.stop();
    }
}
