//! Graph analytics for the Composable Information Machine
//!
//! Graphs are persistent values: every mutation of a [`PersistentGraph`] yields a
//! new graph and leaves the old one intact. The [`Graph`] aggregate wraps one such
//! value with a name and version; commands applied through a
//! [`GraphCommandHandler`] are committed to a [`GraphRepository`] and then handed
//! to the metrics pipeline, which recomputes structural metrics on a bounded pool
//! of background workers.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod metrics;
pub mod persistent;
pub mod value_objects;

// Re-export main types
pub use aggregate::{Graph, GraphRecord, GraphSnapshot, DEFAULT_EDGE_LABEL};
pub use config::MetricsConfig;
pub use events::GraphSaved;

// Re-export commands and their types
pub use commands::{GraphCommand, GraphCommandError, GraphCommandOutcome, GraphCommandResult};

// Re-export command handlers
pub use handlers::{GraphCommandHandler, GraphCommandHandlerImpl, GraphRepository};

pub use infrastructure::{InMemoryGraphRepository, InMemoryMetricsStore};

pub use metrics::{
    compute_report, DegreeDistributionEntry, GraphLookup, GraphMetrics, MetricsComputationService,
    MetricsError, MetricsReport, MetricsResult, MetricsSink, MetricsWorkerPool, MutationTrigger,
    NodeMetrics,
};

pub use persistent::{Context, Decomposition, GraphError, GraphResult, PersistentGraph};

// Re-export identifiers
pub use value_objects::{GraphId, NodeId, NodeIdGenerator, TimeOrderedIdGenerator};
