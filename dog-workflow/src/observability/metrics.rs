use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Live counters for workflow runs
#[derive(Debug, Default)]
pub struct RunMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_stopped: AtomicU64,

    // Per-runnable metrics
    per_runnable: RwLock<HashMap<String, RunnableMetrics>>,
}

/// Counters for one runnable name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnableMetrics {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub stopped: u64,
    pub total_time: Duration,
}

impl RunnableMetrics {
    /// Mean wall-clock time of finished runs.
    pub fn average_time(&self) -> Option<Duration> {
        let finished = self.completed + self.failed + self.stopped;
        if finished == 0 {
            return None;
        }
        let nanos = self.total_time.as_nanos() / u128::from(finished);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_started(&self, runnable: &str) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        self.with_entry(runnable, |m| m.started += 1);
    }

    pub fn increment_completed(&self, runnable: &str, elapsed: Duration) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.with_entry(runnable, |m| {
            m.completed += 1;
            m.total_time += elapsed;
        });
    }

    pub fn increment_failed(&self, runnable: &str, elapsed: Duration) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        self.with_entry(runnable, |m| {
            m.failed += 1;
            m.total_time += elapsed;
        });
    }

    pub fn increment_stopped(&self, runnable: &str, elapsed: Duration) {
        self.runs_stopped.fetch_add(1, Ordering::Relaxed);
        self.with_entry(runnable, |m| {
            m.stopped += 1;
            m.total_time += elapsed;
        });
    }

    fn with_entry(&self, runnable: &str, update: impl FnOnce(&mut RunnableMetrics)) {
        let mut map = self.per_runnable.write();
        update(map.entry(runnable.to_string()).or_default());
    }

    // Getters for global metrics
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn runs_stopped(&self) -> u64 {
        self.runs_stopped.load(Ordering::Relaxed)
    }

    /// Runs started but not yet finished.
    pub fn runs_in_flight(&self) -> u64 {
        let finished = self.runs_completed() + self.runs_failed() + self.runs_stopped();
        self.runs_started().saturating_sub(finished)
    }

    /// Share of finished runs that completed, in percent.
    pub fn success_rate(&self) -> f64 {
        let completed = self.runs_completed() as f64;
        let total = completed + self.runs_failed() as f64;
        if total == 0.0 {
            100.0
        } else {
            (completed / total) * 100.0
        }
    }

    pub fn runnable_metrics(&self, runnable: &str) -> Option<RunnableMetrics> {
        self.per_runnable.read().get(runnable).cloned()
    }

    pub fn all_runnable_metrics(&self) -> HashMap<String, RunnableMetrics> {
        self.per_runnable.read().clone()
    }
}
