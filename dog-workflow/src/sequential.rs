//! Sequential composition: each stage consumes the previous stage's output.

use std::fmt;
use std::sync::Arc;

use dog_futures::{channel, BoxFuture, Future, Outcome, Promise};
use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::runnable::{launch, DynRunnable, Runnable};
use crate::stop::{RunSignals, StopSignal};

/// Runs stages one after another over the same state type.
///
/// `run` returns at once: stage k+1 is started from the completion of stage
/// k, on whichever thread resolved it. A failing stage resolves the whole
/// run with its failure and the later stages are never invoked. Stopping
/// skips every stage that has not started.
pub struct Sequential<S> {
    stages: Arc<Vec<DynRunnable<S>>>,
    signals: RunSignals,
}

impl<S> Sequential<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Fails with `WorkflowError::Empty` when `stages` is empty.
    pub fn new(stages: Vec<DynRunnable<S>>) -> WorkflowResult<Self> {
        if stages.is_empty() {
            return Err(WorkflowError::Empty {
                combinator: "Sequential",
            });
        }
        Ok(Self {
            stages: Arc::new(stages),
            signals: RunSignals::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Start stage `index` and arrange for the next one to follow it.
fn advance<S>(stages: Arc<Vec<DynRunnable<S>>>, index: usize, state: S, signal: StopSignal, promise: Promise<S>)
where
    S: Clone + Send + Sync + 'static,
{
    let Some(stage) = stages.get(index) else {
        promise.set_value(state);
        return;
    };
    if signal.is_raised() {
        debug!("Sequential stopped before stage {} ({})", index, stage.name());
        promise.set_failure(WorkflowError::Stopped);
        return;
    }

    let future = launch(&**stage, state, &signal);
    let next = stages.clone();
    future.on_done(Box::new(move |outcome: &Outcome<S>| match outcome {
        Ok(state) => advance(next, index + 1, state.clone(), signal, promise),
        Err(failure) => {
            debug!("Sequential stage {} failed: {}", index, failure);
            promise.resolve(Err(failure.clone()));
        }
    }));
}

impl<S> Runnable for Sequential<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Input = S;
    type Output = S;

    fn run(&self, input: S) -> BoxFuture<S> {
        let (promise, future) = channel();
        advance(self.stages.clone(), 0, input, self.signals.begin(), promise);
        Box::new(future)
    }

    fn stop(&self) {
        self.signals.raise_all();
        for stage in self.stages.iter() {
            stage.stop();
        }
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.stages.iter().map(|s| s.name()).collect();
        names.join(" | ")
    }
}

impl<S> fmt::Debug for Sequential<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequential")
            .field("stages", &self.stages.len())
            .field("in_flight", &self.signals.in_flight())
            .finish()
    }
}

/// Two runnables in a row, possibly with different state types.
///
/// Built with `RunnableExt::then`; chains nest, so `a.then(b).then(c)` is
/// a three-stage pipeline. Like `Sequential`, `run` never waits.
pub struct Chain<A, B> {
    first: Arc<A>,
    second: Arc<B>,
    signals: RunSignals,
}

impl<A, B> Chain<A, B>
where
    A: Runnable,
    B: Runnable<Input = A::Output>,
{
    pub fn new(first: A, second: B) -> Self {
        Self {
            first: Arc::new(first),
            second: Arc::new(second),
            signals: RunSignals::new(),
        }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A, B> Runnable for Chain<A, B>
where
    A: Runnable,
    B: Runnable<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn run(&self, input: A::Input) -> BoxFuture<B::Output> {
        let (promise, future) = channel();
        let signal = self.signals.begin();
        let second = self.second.clone();

        let mid = launch(&*self.first, input, &signal);
        mid.on_done(Box::new(move |outcome: &Outcome<A::Output>| {
            let mid = match outcome {
                Ok(mid) => mid.clone(),
                Err(failure) => return promise.resolve(Err(failure.clone())),
            };
            if signal.is_raised() {
                debug!("Chain stopped before {}", second.name());
                return promise.set_failure(WorkflowError::Stopped);
            }
            launch(&*second, mid, &signal)
                .on_done(Box::new(move |outcome: &Outcome<B::Output>| promise.resolve(outcome.clone())));
        }));
        Box::new(future)
    }

    fn stop(&self) {
        self.signals.raise_all();
        self.first.stop();
        self.second.stop();
    }

    fn name(&self) -> String {
        format!("{} | {}", self.first.name(), self.second.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::{Identity, Lambda};
    use crate::runnable::RunnableExt;
    use crate::testing::Sleeper;
    use dog_futures::utils::TicToc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::time::Duration;

    #[derive(thiserror::Error, Debug)]
    #[error("diverged")]
    struct Diverged;

    fn add(n: i32) -> DynRunnable<i32> {
        Lambda::new(move |x: i32| Ok(x + n)).shared()
    }

    #[test]
    fn test_empty_rejected() {
        let err = Sequential::<i32>::new(vec![]).unwrap_err();
        assert_eq!(err, WorkflowError::Empty { combinator: "Sequential" });
    }

    #[test]
    fn test_stages_in_order() {
        let times_ten = Lambda::new(|x: i32| Ok(x * 10)).shared();
        let flow = Sequential::new(vec![add(1), times_ten, add(2)]).unwrap();
        assert_eq!(flow.run(0).result().unwrap(), 12);
        assert_eq!(flow.len(), 3);
    }

    #[test]
    fn test_failure_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let failing = Lambda::<i32>::new(|_| Err(Diverged.into())).shared();
        let after = Lambda::new(move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(x)
        })
        .shared();

        let flow = Sequential::new(vec![failing, after]).unwrap();
        let err = flow.run(0).result().unwrap_err();
        assert!(err.failure().unwrap().is::<Diverged>());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chain_changes_type() {
        let parse = Lambda::new(|s: String| Ok(s.parse::<i32>()?));
        let flow = parse.then(Lambda::new(|x: i32| Ok(x * 2)));
        assert_eq!(flow.run("21".to_string()).result().unwrap(), 42);
        assert_eq!(flow.name(), "Lambda | Lambda");

        let err = flow.run("x".to_string()).result().unwrap_err();
        assert!(err.failure().unwrap().is::<std::num::ParseIntError>());
    }

    #[test]
    fn test_name_lists_stages() {
        let a = Lambda::new(|x: i32| Ok(x)).named("Tabu").shared();
        let b = Lambda::new(|x: i32| Ok(x)).named("Greedy").shared();
        assert_eq!(Sequential::new(vec![a, b]).unwrap().name(), "Tabu | Greedy");
    }

    #[test]
    fn test_run_returns_while_stage_pending() {
        let flow = Sequential::new(vec![
            Sleeper::<i32>::new(Duration::from_millis(300)).shared(),
            Identity::new().shared(),
        ])
        .unwrap();

        let clock = TicToc::tic();
        let future = flow.run(1);
        assert!(clock.toc() < Duration::from_millis(150));
        assert!(!future.done());
        assert!(future.result_timeout(Duration::from_millis(10)).unwrap_err().is_timeout());
        assert_eq!(future.result().unwrap(), 1);
    }

    #[test]
    fn test_chain_run_returns_while_pending() {
        let flow = Sleeper::<i32>::new(Duration::from_millis(300)).then(Lambda::new(|x: i32| Ok(x + 1)));
        let future = flow.run(1);
        assert!(!future.done());
        assert_eq!(future.result().unwrap(), 2);
    }

    /// Stops the enclosing workflow from inside its own `run`, before
    /// delegating to a long sleeper.
    struct StopsFlowOnStart {
        flow: Arc<OnceLock<Arc<Sequential<i32>>>>,
        inner: Sleeper<i32>,
    }

    impl Runnable for StopsFlowOnStart {
        type Input = i32;
        type Output = i32;

        fn run(&self, input: i32) -> BoxFuture<i32> {
            if let Some(flow) = self.flow.get() {
                flow.stop();
            }
            self.inner.run(input)
        }

        fn stop(&self) {
            self.inner.stop();
        }
    }

    #[test]
    fn test_stop_while_stage_starts_reaches_it() {
        let cell = Arc::new(OnceLock::new());
        let stage = StopsFlowOnStart {
            flow: cell.clone(),
            inner: Sleeper::new(Duration::from_secs(10)),
        };
        let flow = Arc::new(Sequential::new(vec![Identity::new().shared(), stage.shared()]).unwrap());
        cell.set(flow.clone()).unwrap();

        let clock = TicToc::tic();
        let out = flow.run(5).result_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(out, 5);
        assert!(clock.toc() < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_applies_to_run_in_flight_only() {
        let flow = Sequential::new(vec![
            Sleeper::<i32>::new(Duration::from_secs(10)).shared(),
            add(1),
        ])
        .unwrap();

        let stopped = flow.run(0);
        flow.stop();
        let err = stopped.result_timeout(Duration::from_secs(5)).unwrap_err();
        assert!(WorkflowError::is_stopped(err.failure().unwrap()));

        let quick = Sequential::new(vec![add(1), add(2)]).unwrap();
        quick.stop();
        assert_eq!(quick.run(0).result().unwrap(), 3);
    }
}
