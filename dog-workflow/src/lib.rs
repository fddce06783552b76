//! # dog-workflow: composable solver workflows
//!
//! Build pipelines of solvers that run one after another or side by side
//! over a shared problem state:
//!
//! - **Runnable**: a stage mapping an input state to a future output state
//! - **Sequential / Chain**: feed each stage's output into the next
//! - **Parallel**: give every branch the same input and wait for all of them
//! - **Loop**: repeat a stage on its own output
//! - **Dispatched**: move any stage onto another executor
//!
//! ```rust
//! use std::time::Duration;
//! use dog_workflow::prelude::*;
//!
//! let scale = Lambda::new(|x: i64| Ok(x * 3));
//! let shift = Lambda::new(|x: i64| Ok(x - 1));
//! let flow = scale.then(shift);
//! assert_eq!(flow.run(5).result().unwrap(), 14);
//!
//! // Two 50ms branches on the thread pool overlap.
//! let fan = Parallel::new(vec![
//!     Sleeper::<State>::new(Duration::from_millis(50)).shared(),
//!     Sleeper::new(Duration::from_millis(50)).shared(),
//! ])
//! .unwrap();
//! let states = fan.run(State::from_problem("qubo")).result().unwrap();
//! assert_eq!(states.len(), 2);
//! ```

pub mod dispatch;
pub mod error;
pub mod ids;
pub mod lambda;
pub mod observability;
pub mod parallel;
pub mod repeat;
pub mod runnable;
pub mod sequential;
pub mod state;
pub mod stop;
pub mod testing;

pub use dispatch::Dispatched;
pub use error::{WorkflowError, WorkflowResult};
pub use ids::RunId;
pub use lambda::{Identity, Lambda};
pub use observability::{ObservabilityLayer, Observed, RunEvent, RunMetrics, RunnableMetrics};
pub use parallel::{join, Parallel};
pub use repeat::Loop;
pub use runnable::{DynRunnable, Runnable, RunnableExt};
pub use sequential::{Chain, Sequential};
pub use state::{State, States, PROBLEM_KEY};
pub use stop::{RunSignals, StopSignal};
pub use testing::{Sleeper, Spinner};

#[cfg(feature = "tracing-basic")]
pub use observability::init_tracing;

pub mod prelude {
    pub use crate::{
        Chain, DynRunnable, Identity, Lambda, Loop, Parallel, Runnable, RunnableExt, Sequential,
        Sleeper, Spinner, State, States, StopSignal, WorkflowError,
    };
    pub use dog_futures::prelude::*;
}
