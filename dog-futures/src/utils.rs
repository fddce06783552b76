use std::time::{Duration, Instant};

/// Number of CPUs available to this process, at least 1.
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Wall-clock stopwatch.
///
/// ```rust
/// use dog_futures::utils::TicToc;
///
/// let timer = TicToc::tic();
/// let dt = timer.toc();
/// assert!(dt <= timer.toc());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TicToc {
    start: Instant,
}

impl TicToc {
    /// Start timing.
    pub fn tic() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since `tic`.
    pub fn toc(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time a closure, returning its value and the elapsed time.
    pub fn measure<T>(f: impl FnOnce() -> T) -> (T, Duration) {
        let timer = Self::tic();
        let value = f();
        (value, timer.toc())
    }
}
