//! Configuration for the metrics pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix, e.g. `GRAPH_METRICS__WORKER_COUNT=4`
const ENV_PREFIX: &str = "GRAPH_METRICS";

/// Settings for asynchronous metrics recomputation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Number of worker tasks draining the recomputation queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum number of queued recomputations before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Wait before resolving a graph by id when the trigger carries no snapshot
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_worker_count() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    50
}

fn default_settle_delay_ms() -> u64 {
    100
}

impl MetricsConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&MetricsConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: MetricsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the worker pool cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.worker_count == 0 {
            return Err(config::ConfigError::Message(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
