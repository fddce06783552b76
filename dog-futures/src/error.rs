//! # Failures
//!
//! Two families of errors live here:
//! - `Failure`: whatever a wrapped computation failed with. It is carried
//!   inside an `anyhow::Error` so the original kind survives and can be
//!   recovered with `downcast_ref`.
//! - infrastructure errors (`FutureError`, `InvalidConstruction`, ...) that
//!   describe what went wrong around the computation, not inside it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error as AnyError;
use thiserror::Error;

/// Result type carried inside every resolved future.
pub type Outcome<T> = Result<T, Failure>;

/// A captured computation failure.
///
/// Cloning is cheap and never re-runs anything: every clone points at the
/// same underlying error.
#[derive(Clone)]
pub struct Failure {
    inner: Arc<AnyError>,
}

impl Failure {
    /// Capture any error, keeping its concrete type.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<AnyError>,
    {
        let err: AnyError = err.into();
        Self::from(err)
    }

    /// Build a failure from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(AnyError::msg(message))
    }

    /// Downcast to the original error kind.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Check whether the original error is of kind `E`.
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.is::<E>()
    }

    /// Borrow the underlying `anyhow::Error`.
    pub fn as_anyhow(&self) -> &AnyError {
        &self.inner
    }

    /// True if both failures point at the same captured error.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<AnyError> for Failure {
    /// An error that already wraps a `Failure` (e.g. one propagated with `?`
    /// out of a nested future) is unwrapped instead of nested again.
    fn from(err: AnyError) -> Self {
        let err = match err.downcast::<Failure>() {
            Ok(failure) => return failure,
            Err(err) => err,
        };
        match err.downcast::<FutureError>() {
            Ok(FutureError::Failed(failure)) => failure,
            Ok(timeout) => Self {
                inner: Arc::new(AnyError::new(timeout)),
            },
            Err(err) => Self {
                inner: Arc::new(err),
            },
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Error returned when observing a future's result.
#[derive(Error, Debug, Clone)]
pub enum FutureError {
    /// The future did not resolve within the wait bound. The computation
    /// keeps running and can still be observed later.
    #[error("Timed out after {0:?} waiting for result")]
    Timeout(Duration),

    /// The computation itself failed.
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl FutureError {
    /// Check if this error is a wait timeout rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Get the computation failure, if that is what this error is.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Timeout(_) => None,
        }
    }

    /// Collapse into a `Failure`, wrapping a timeout as its own failure kind.
    pub fn into_failure(self) -> Failure {
        match self {
            Self::Failed(failure) => failure,
            timeout @ Self::Timeout(_) => Failure::new(timeout),
        }
    }
}

/// A `Present` was built with both or neither of value and failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Present requires exactly one of value or failure (value: {has_value}, failure: {has_failure})")]
pub struct InvalidConstruction {
    pub has_value: bool,
    pub has_failure: bool,
}

/// The callable panicked instead of returning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Task panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    /// Extract a readable message from a panic payload.
    pub fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }
}

/// The resolving half of a future was dropped without a result, e.g. the
/// pool it was queued on shut down first.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Promise dropped before it was resolved")]
pub struct Abandoned;
