use dog_futures::Failure;
use thiserror::Error;

/// Result type for workflow construction
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Workflow-level error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The runnable was stopped before this stage started.
    #[error("Workflow stopped before completion")]
    Stopped,

    #[error("{combinator} requires at least one runnable")]
    Empty { combinator: &'static str },
}

impl WorkflowError {
    /// Check whether a failure is a stop rather than a real error.
    pub fn is_stopped(failure: &Failure) -> bool {
        matches!(failure.downcast_ref::<WorkflowError>(), Some(WorkflowError::Stopped))
    }
}

impl From<WorkflowError> for Failure {
    fn from(err: WorkflowError) -> Self {
        Failure::new(err)
    }
}
