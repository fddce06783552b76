//! Parallel composition with join semantics.
//!
//! Every branch receives a clone of the same input and is started through
//! its own executor, so branches bound to a thread pool overlap. The
//! composite resolves only once all branches are terminal: a slow branch is
//! always waited for, even after a fast one failed. Racing for the first
//! result is not supported.

use std::fmt;
use std::sync::Arc;

use dog_futures::{channel, BoxFuture, Failure, Future, Outcome, Promise};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{WorkflowError, WorkflowResult};
use crate::runnable::{launch, DynRunnable, Runnable};
use crate::state::States;
use crate::stop::RunSignals;

pub struct Parallel<I, O = I> {
    branches: Arc<Vec<DynRunnable<I, O>>>,
    signals: RunSignals,
}

impl<I, O> Parallel<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Fails with `WorkflowError::Empty` when `branches` is empty.
    pub fn new(branches: Vec<DynRunnable<I, O>>) -> WorkflowResult<Self> {
        if branches.is_empty() {
            return Err(WorkflowError::Empty {
                combinator: "Parallel",
            });
        }
        Ok(Self {
            branches: Arc::new(branches),
            signals: RunSignals::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl<I, O> Runnable for Parallel<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Input = I;
    type Output = States<O>;

    fn run(&self, input: I) -> BoxFuture<States<O>> {
        let signal = self.signals.begin();
        let futures: Vec<BoxFuture<O>> = self
            .branches
            .iter()
            .map(|branch| launch(&**branch, input.clone(), &signal))
            .collect();
        join(futures)
    }

    fn stop(&self) {
        self.signals.raise_all();
        for branch in self.branches.iter() {
            branch.stop();
        }
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.branches.iter().map(|b| b.name()).collect();
        format!("[{}]", names.join(" & "))
    }
}

impl<I, O> fmt::Debug for Parallel<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parallel")
            .field("branches", &self.branches.len())
            .field("in_flight", &self.signals.in_flight())
            .finish()
    }
}

struct JoinState<O> {
    outcomes: Vec<Option<Outcome<O>>>,
    remaining: usize,
    promise: Option<Promise<States<O>>>,
}

/// Combine futures into one that resolves once every input is terminal.
///
/// Never waits: each input reports through `on_done`, and the last one to
/// finish resolves the result, either all values in input order or the
/// lowest-indexed failure.
pub fn join<O>(futures: Vec<BoxFuture<O>>) -> BoxFuture<States<O>>
where
    O: Clone + Send + Sync + 'static,
{
    let (promise, joined) = channel();
    if futures.is_empty() {
        promise.set_value(States::new(Vec::new()));
        return Box::new(joined);
    }

    let state = Arc::new(Mutex::new(JoinState {
        outcomes: vec![None; futures.len()],
        remaining: futures.len(),
        promise: Some(promise),
    }));

    for (index, future) in futures.into_iter().enumerate() {
        let state = state.clone();
        future.on_done(Box::new(move |outcome: &Outcome<O>| {
            let finished = {
                let mut join = state.lock();
                join.outcomes[index] = Some(outcome.clone());
                join.remaining -= 1;
                if join.remaining > 0 {
                    return;
                }
                let outcomes = std::mem::take(&mut join.outcomes);
                join.promise.take().map(|promise| (promise, outcomes))
            };
            if let Some((promise, outcomes)) = finished {
                promise.resolve(collect(outcomes));
            }
        }));
    }
    Box::new(joined)
}

fn collect<O>(outcomes: Vec<Option<Outcome<O>>>) -> Outcome<States<O>> {
    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| matches!(o, Some(Err(_)))).count();
    if failed > 0 {
        warn!("{} of {} parallel branches failed", failed, total);
    }

    outcomes
        .into_iter()
        .map(|o| o.unwrap_or_else(|| Err(Failure::msg("parallel branch never reported"))))
        .collect::<Result<Vec<O>, Failure>>()
        .map(States::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::Lambda;
    use crate::runnable::RunnableExt;
    use crate::testing::Sleeper;
    use dog_futures::utils::TicToc;
    use dog_futures::{thread_executor, Present};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(thiserror::Error, Debug)]
    #[error("branch {0} failed")]
    struct BranchFailed(usize);

    #[test]
    fn test_empty_rejected() {
        let err = Parallel::<i32>::new(vec![]).unwrap_err();
        assert_eq!(err, WorkflowError::Empty { combinator: "Parallel" });
    }

    #[test]
    fn test_results_in_branch_order() {
        let branches: Vec<DynRunnable<i32>> = (1..=3)
            .map(|k| Lambda::new(move |x: i32| Ok(x * k)).shared())
            .collect();
        let flow = Parallel::new(branches).unwrap();
        let states = flow.run(5).result().unwrap();
        assert_eq!(states.into_inner(), vec![5, 10, 15]);
    }

    #[test]
    fn test_lowest_index_failure_after_all_done() {
        let finished = Arc::new(AtomicUsize::new(0));
        let branches: Vec<DynRunnable<(), usize>> = (0..4)
            .map(|i| {
                let finished = finished.clone();
                Lambda::new(move |_: ()| {
                    std::thread::sleep(Duration::from_millis(20 * (4 - i as u64)));
                    finished.fetch_add(1, Ordering::SeqCst);
                    if i % 2 == 1 {
                        Err(BranchFailed(i).into())
                    } else {
                        Ok(i)
                    }
                })
                .with_executor(thread_executor())
                .shared()
            })
            .collect();

        let err = Parallel::new(branches).unwrap().run(()).result().unwrap_err();
        let failure = err.failure().unwrap();
        assert_eq!(failure.downcast_ref::<BranchFailed>().unwrap().0, 1);
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_join_helper() {
        let futures: Vec<BoxFuture<i32>> = vec![
            Box::new(Present::value(1)),
            Box::new(Present::failure(Failure::msg("second"))),
            Box::new(Present::failure(Failure::msg("third"))),
        ];
        let failure = join(futures).result().unwrap_err().into_failure();
        assert_eq!(failure.to_string(), "second");
    }

    #[test]
    fn test_join_keeps_input_order() {
        let (slow, slow_future) = channel();
        let (fast, fast_future) = channel();
        let futures: Vec<BoxFuture<&str>> = vec![Box::new(slow_future), Box::new(fast_future)];
        let joined = join(futures);

        fast.set_value("fast");
        assert!(!joined.done());
        slow.set_value("slow");

        assert_eq!(joined.result().unwrap().into_inner(), vec!["slow", "fast"]);
        assert!(join::<i32>(vec![]).result().unwrap().is_empty());
    }

    #[test]
    fn test_run_returns_while_branches_pending() {
        let flow = Parallel::new(vec![
            Sleeper::<i32>::new(Duration::from_millis(300)).shared(),
            Sleeper::new(Duration::from_millis(300)).shared(),
        ])
        .unwrap();

        let clock = TicToc::tic();
        let future = flow.run(1);
        assert!(clock.toc() < Duration::from_millis(150));
        assert!(!future.done());
        assert!(future.result_timeout(Duration::from_millis(10)).unwrap_err().is_timeout());
        assert_eq!(future.result().unwrap().into_inner(), vec![1, 1]);
    }
}
