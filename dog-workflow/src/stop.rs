use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    raised: Mutex<bool>,
    changed: Condvar,
}

/// Cooperative stop flag shared between a runnable and its running work.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the work to stop. Wakes anyone in `sleep`.
    pub fn raise(&self) {
        *self.inner.raised.lock() = true;
        self.inner.changed.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        *self.inner.raised.lock()
    }

    fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Sleep for `duration` unless raised first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut raised = self.inner.raised.lock();
        while !*raised {
            if self.inner.changed.wait_until(&mut raised, deadline).timed_out() {
                return !*raised;
            }
        }
        false
    }
}

/// Stop signals of the runs a runnable currently has in flight.
///
/// Every `run` takes a fresh signal from `begin`, so a new run never clears
/// the stop of an earlier one. `raise_all` reaches every run still holding
/// its signal. A run releases it by dropping its clones when done.
#[derive(Debug, Default)]
pub struct RunSignals {
    active: Mutex<Vec<StopSignal>>,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run and hand out its signal.
    pub fn begin(&self) -> StopSignal {
        let signal = StopSignal::new();
        let mut active = self.active.lock();
        active.retain(|s| !s.is_orphaned());
        active.push(signal.clone());
        signal
    }

    /// Stop every run in flight.
    pub fn raise_all(&self) {
        let mut active = self.active.lock();
        for signal in active.iter() {
            signal.raise();
        }
        active.retain(|s| !s.is_orphaned());
    }

    /// Number of runs still holding their signal.
    pub fn in_flight(&self) -> usize {
        let mut active = self.active.lock();
        active.retain(|s| !s.is_orphaned());
        active.len()
    }
}
