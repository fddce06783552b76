use std::time::Duration;

use crate::error::{Failure, FutureError, InvalidConstruction, Outcome};
use crate::future::{DoneCallback, Future};

/// A future that is already resolved when constructed.
///
/// ```rust
/// use dog_futures::{Future, Present};
///
/// let f = Present::value(42);
/// assert!(f.done());
/// assert_eq!(f.result().unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct Present<T> {
    outcome: Outcome<T>,
}

impl<T> Present<T> {
    /// Build from an optional value and an optional failure.
    ///
    /// Exactly one of the two must be given; anything else is rejected here
    /// rather than on first access.
    pub fn new(value: Option<T>, failure: Option<Failure>) -> Result<Self, InvalidConstruction> {
        match (value, failure) {
            (Some(value), None) => Ok(Self::value(value)),
            (None, Some(failure)) => Ok(Self::failure(failure)),
            (value, failure) => Err(InvalidConstruction {
                has_value: value.is_some(),
                has_failure: failure.is_some(),
            }),
        }
    }

    /// A future resolved with `value`.
    pub fn value(value: T) -> Self {
        Self { outcome: Ok(value) }
    }

    /// A future resolved with `failure`.
    pub fn failure(failure: impl Into<Failure>) -> Self {
        Self {
            outcome: Err(failure.into()),
        }
    }

    /// Wrap an already computed outcome.
    pub fn from_outcome(outcome: Outcome<T>) -> Self {
        Self { outcome }
    }

    /// Borrow the stored outcome.
    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome<T> {
        self.outcome
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

impl<T> Future<T> for Present<T>
where
    T: Clone + Send + Sync,
{
    fn done(&self) -> bool {
        true
    }

    fn wait(&self, _timeout: Option<Duration>) -> Result<T, FutureError> {
        self.outcome.clone().map_err(FutureError::Failed)
    }

    fn on_done(&self, callback: DoneCallback<T>) {
        callback(&self.outcome)
    }
}
