//! # dog-futures: single-assignment futures and executors
//!
//! The concurrency primitives under DogRS hybrid workflows:
//!
//! - **Future**: a result that is pending, resolved with a value, or resolved
//!   with a failure, assigned at most once
//! - **Present**: a future already resolved when built
//! - **Deferred / Promise**: a pending future and the handle that resolves it
//! - **Executor**: where a callable runs; `ImmediateExecutor` runs it on the
//!   calling thread, `ThreadPoolExecutor` on a worker pool
//!
//! ```rust
//! use dog_futures::prelude::*;
//!
//! let f = immediate_executor().submit(|| Ok(2 + 2));
//! assert!(f.done());
//! assert_eq!(f.result().unwrap(), 4);
//!
//! let pool = ThreadPoolExecutor::with_workers(2).unwrap();
//! let g = pool.submit(|| Ok("from a worker"));
//! assert_eq!(g.result().unwrap(), "from a worker");
//! ```
//!
//! Failures keep their concrete type:
//!
//! ```rust
//! use dog_futures::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("division by zero")]
//! struct DivisionByZero;
//!
//! let f = immediate_executor().submit::<i32, _>(|| Err(DivisionByZero.into()));
//! let err = f.result().unwrap_err();
//! assert!(err.failure().unwrap().is::<DivisionByZero>());
//! ```

pub mod config;
pub mod deferred;
pub mod error;
pub mod executor;
pub mod future;
pub mod present;
pub mod utils;

pub use config::{FlowConfig, FlowConfigSnapshot, ThreadPoolConfig};
pub use deferred::{channel, Deferred, Promise};
pub use error::{Abandoned, Failure, FutureError, InvalidConstruction, Outcome, Panicked};
pub use executor::{
    capture, capture_outcome, immediate_executor, thread_executor, try_thread_executor, Executor, ExecutorExt,
    ImmediateExecutor, Task, ThreadPoolExecutor,
};
pub use future::{BoxFuture, DoneCallback, Future};
pub use present::Present;

pub mod prelude {
    pub use crate::{
        immediate_executor, thread_executor, BoxFuture, Executor, ExecutorExt, Failure, Future,
        FutureError, ImmediateExecutor, Outcome, Present, ThreadPoolExecutor,
    };
}
