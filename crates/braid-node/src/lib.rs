//! # Braid Node
//!
//! Runtime shell around the Braid event-creation engine: configuration,
//! the single-writer creation worker, lifecycle gating and metrics.

pub mod config;
pub mod metrics;
pub mod node;
pub mod worker;

pub use config::NodeConfig;
pub use metrics::{CreationMetrics, MetricsServer};
pub use node::BraidNode;
pub use worker::{CreationWorker, CreatorCommand, CreatorHandle, CreatorMailbox};

use config::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber from the logging settings.
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
