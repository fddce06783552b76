use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dog_futures::{channel, BoxFuture, Failure, Future, Outcome};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{RunEvent, RunMetrics};
use crate::error::WorkflowError;
use crate::ids::RunId;
use crate::runnable::Runnable;

const EVENT_CAPACITY: usize = 1024;

/// Event stream and live metrics for workflow runs
#[derive(Clone)]
pub struct ObservabilityLayer {
    event_broadcaster: broadcast::Sender<RunEvent>,
    metrics: Arc<RunMetrics>,
}

impl ObservabilityLayer {
    pub fn new() -> Self {
        let (event_broadcaster, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            event_broadcaster,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    pub fn record_started(&self, run_id: &RunId, runnable: &str) {
        let event = RunEvent::Started {
            run_id: run_id.clone(),
            runnable: runnable.to_string(),
            at: Utc::now(),
        };

        self.metrics.increment_started(runnable);
        let _ = self.event_broadcaster.send(event);
        debug!("Run started: {} ({})", run_id, runnable);
    }

    pub fn record_completed(&self, run_id: &RunId, runnable: &str, elapsed: Duration) {
        let event = RunEvent::Completed {
            run_id: run_id.clone(),
            runnable: runnable.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
            at: Utc::now(),
        };

        self.metrics.increment_completed(runnable, elapsed);
        let _ = self.event_broadcaster.send(event);
        debug!("Run completed: {} ({}) in {:?}", run_id, runnable, elapsed);
    }

    /// Record a failed run. A `Stopped` failure is recorded as a stop.
    pub fn record_failed(&self, run_id: &RunId, runnable: &str, failure: &Failure, elapsed: Duration) {
        if WorkflowError::is_stopped(failure) {
            let event = RunEvent::Stopped {
                run_id: run_id.clone(),
                runnable: runnable.to_string(),
                at: Utc::now(),
            };
            self.metrics.increment_stopped(runnable, elapsed);
            let _ = self.event_broadcaster.send(event);
            debug!("Run stopped: {} ({})", run_id, runnable);
            return;
        }

        let event = RunEvent::Failed {
            run_id: run_id.clone(),
            runnable: runnable.to_string(),
            error: failure.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
            at: Utc::now(),
        };

        self.metrics.increment_failed(runnable, elapsed);
        let _ = self.event_broadcaster.send(event);
        warn!("Run failed: {} ({}): {}", run_id, runnable, failure);
    }

    /// Subscribe to events recorded from now on
    pub fn event_stream(&self) -> broadcast::Receiver<RunEvent> {
        self.event_broadcaster.subscribe()
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }
}

impl Default for ObservabilityLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservabilityLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservabilityLayer")
            .field("subscribers", &self.event_broadcaster.receiver_count())
            .finish()
    }
}

/// A runnable whose runs are reported to an `ObservabilityLayer`.
///
/// Built with `RunnableExt::observed`. The returned future resolves only
/// after the run's end has been recorded.
pub struct Observed<R> {
    inner: R,
    layer: Arc<ObservabilityLayer>,
}

impl<R: Runnable> Observed<R> {
    pub fn new(inner: R, layer: Arc<ObservabilityLayer>) -> Self {
        Self { inner, layer }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn layer(&self) -> &Arc<ObservabilityLayer> {
        &self.layer
    }
}

impl<R: Runnable> Runnable for Observed<R> {
    type Input = R::Input;
    type Output = R::Output;

    fn run(&self, input: R::Input) -> BoxFuture<R::Output> {
        let run_id = RunId::new();
        let name = self.inner.name();
        self.layer.record_started(&run_id, &name);

        let started = Instant::now();
        let (promise, recorded) = channel();
        let layer = self.layer.clone();
        self.inner.run(input).on_done(Box::new(move |outcome: &Outcome<R::Output>| {
            match outcome {
                Ok(_) => layer.record_completed(&run_id, &name, started.elapsed()),
                Err(failure) => layer.record_failed(&run_id, &name, failure, started.elapsed()),
            }
            promise.resolve(outcome.clone());
        }));
        Box::new(recorded)
    }

    fn stop(&self) {
        self.inner.stop()
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}
