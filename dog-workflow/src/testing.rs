//! Helpers for timing-based workflow tests.
//!
//! `Sleeper` and `Spinner` are stand-in solvers with a known cost: one
//! waits, the other burns CPU. `assert_runtime_within!` checks how long a
//! block took.

use std::fmt;
use std::hint::black_box;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use dog_futures::{thread_executor, BoxFuture, Executor, ExecutorExt};

use crate::runnable::Runnable;
use crate::stop::RunSignals;

pub use dog_futures::utils::{cpu_count, TicToc};

/// Evaluate `$body` and panic unless it took between `$low` and `$high`
/// (both `Duration`s, inclusive). Yields the body's value.
///
/// ```rust
/// use std::time::Duration;
/// use dog_workflow::assert_runtime_within;
///
/// let v = assert_runtime_within!(Duration::ZERO, Duration::from_secs(5), 1 + 1);
/// assert_eq!(v, 2);
/// ```
#[macro_export]
macro_rules! assert_runtime_within {
    ($low:expr, $high:expr, $body:expr) => {{
        let (value, elapsed) = $crate::testing::TicToc::measure(|| $body);
        $crate::testing::check_runtime(elapsed, $low, $high);
        value
    }};
}

#[doc(hidden)]
#[track_caller]
pub fn check_runtime(elapsed: Duration, low: Duration, high: Duration) {
    assert!(
        low <= elapsed && elapsed <= high,
        "runtime {:?} outside [{:?}, {:?}]",
        elapsed,
        low,
        high
    );
}

/// Solver stand-in that waits for a fixed time, then returns its input.
///
/// The wait ends early when stopped. Runs on the shared thread executor
/// unless rebound.
pub struct Sleeper<S> {
    duration: Duration,
    executor: Arc<dyn Executor>,
    signals: RunSignals,
    _state: PhantomData<fn() -> S>,
}

impl<S> Sleeper<S> {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            executor: thread_executor(),
            signals: RunSignals::new(),
            _state: PhantomData,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }
}

impl<S> Runnable for Sleeper<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Input = S;
    type Output = S;

    fn run(&self, input: S) -> BoxFuture<S> {
        let signal = self.signals.begin();
        let duration = self.duration;
        self.executor.submit(move || {
            signal.sleep(duration);
            Ok(input)
        })
    }

    fn stop(&self) {
        self.signals.raise_all();
    }

    fn name(&self) -> String {
        format!("Sleeper({}ms)", self.duration.as_millis())
    }
}

impl<S> fmt::Debug for Sleeper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleeper")
            .field("duration", &self.duration)
            .field("executor", &self.executor.name())
            .finish()
    }
}

/// Solver stand-in that keeps one core busy for a number of rounds, then
/// returns its input.
pub struct Spinner<S> {
    rounds: u64,
    executor: Arc<dyn Executor>,
    signals: RunSignals,
    _state: PhantomData<fn() -> S>,
}

const ROUNDS_PER_CHECK: u64 = 1 << 14;

impl<S> Spinner<S> {
    pub fn new(rounds: u64) -> Self {
        Self {
            rounds,
            executor: thread_executor(),
            signals: RunSignals::new(),
            _state: PhantomData,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }
}

impl<S> Runnable for Spinner<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Input = S;
    type Output = S;

    fn run(&self, input: S) -> BoxFuture<S> {
        let signal = self.signals.begin();
        let rounds = self.rounds;
        self.executor.submit(move || {
            let mut acc: u64 = 0x9E37_79B9_7F4A_7C15;
            for round in 0..rounds {
                if round % ROUNDS_PER_CHECK == 0 && signal.is_raised() {
                    break;
                }
                acc = black_box(acc.rotate_left(5) ^ round).wrapping_mul(0x5851_F42D_4C95_7F2D);
            }
            black_box(acc);
            Ok(input)
        })
    }

    fn stop(&self) {
        self.signals.raise_all();
    }

    fn name(&self) -> String {
        format!("Spinner({})", self.rounds)
    }
}

impl<S> fmt::Debug for Spinner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinner")
            .field("rounds", &self.rounds)
            .field("executor", &self.executor.name())
            .finish()
    }
}
