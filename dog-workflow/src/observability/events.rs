use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RunId;

/// Lifecycle events of a single run, broadcast by `ObservabilityLayer`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// `run` was called
    Started {
        run_id: RunId,
        runnable: String,
        at: DateTime<Utc>,
    },

    /// The run resolved with a value
    Completed {
        run_id: RunId,
        runnable: String,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },

    /// The run resolved with a failure
    Failed {
        run_id: RunId,
        runnable: String,
        error: String,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },

    /// The run was stopped before finishing
    Stopped {
        run_id: RunId,
        runnable: String,
        at: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Stopped { .. } => "stopped",
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            Self::Started { run_id, .. } => run_id,
            Self::Completed { run_id, .. } => run_id,
            Self::Failed { run_id, .. } => run_id,
            Self::Stopped { run_id, .. } => run_id,
        }
    }

    pub fn runnable(&self) -> &str {
        match self {
            Self::Started { runnable, .. } => runnable,
            Self::Completed { runnable, .. } => runnable,
            Self::Failed { runnable, .. } => runnable,
            Self::Stopped { runnable, .. } => runnable,
        }
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Started { at, .. } => at,
            Self::Completed { at, .. } => at,
            Self::Failed { at, .. } => at,
            Self::Stopped { at, .. } => at,
        }
    }

    /// True for every event that ends a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }
}
