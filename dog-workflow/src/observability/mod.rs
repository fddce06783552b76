pub mod events;
pub mod layer;
pub mod metrics;

pub use events::RunEvent;
pub use layer::{ObservabilityLayer, Observed};
pub use metrics::{RunMetrics, RunnableMetrics};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
