//! Structural graph metrics
//!
//! Metrics are computed from one immutable graph snapshot and stored as three
//! record sets per graph: the aggregate [`GraphMetrics`], one [`NodeMetrics`] per
//! node, and the [`DegreeDistributionEntry`] histogram. A new computation
//! supersedes all previously stored records for the same graph.

use crate::value_objects::{GraphId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod algorithms;
mod service;
mod worker;

pub use algorithms::{compute_report, ConnectivityResult, GraphAnalysis, PathMetrics};
pub use service::{GraphLookup, MetricsComputationService, MetricsSink};
pub use worker::{MetricsWorkerPool, MutationTrigger};

/// Errors raised by the metrics pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("Graph not found: {0}")]
    MissingGraph(GraphId),

    #[error("Metrics storage error: {0}")]
    Storage(String),

    #[error("Metrics computation failed for graph {graph_id}: {reason}")]
    Computation { graph_id: GraphId, reason: String },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Aggregate metrics of one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub graph_id: GraphId,
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub is_connected: bool,
    pub component_count: usize,
    /// Only present for connected graphs with more than one node
    pub diameter: Option<usize>,
    /// Only present for connected graphs with more than one node
    pub average_path_length: Option<f64>,
    pub average_clustering_coefficient: f64,
    pub computed_at: DateTime<Utc>,
}

/// Metrics of a single node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub graph_id: GraphId,
    pub node_id: NodeId,
    pub in_degree: usize,
    pub out_degree: usize,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
    pub clustering_coefficient: f64,
}

impl NodeMetrics {
    pub fn total_degree(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Number of nodes sharing one total degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeDistributionEntry {
    pub graph_id: GraphId,
    pub degree: usize,
    pub node_count: usize,
}

/// Everything one computation run produces for a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics: GraphMetrics,
    /// Ordered by node id
    pub node_metrics: Vec<NodeMetrics>,
    /// Ordered by ascending degree
    pub degree_distribution: Vec<DegreeDistributionEntry>,
}

impl MetricsReport {
    pub fn graph_id(&self) -> GraphId {
        self.metrics.graph_id
    }

    /// Metrics of one node, if the node was part of the snapshot
    pub fn node(&self, node_id: NodeId) -> Option<&NodeMetrics> {
        self.node_metrics
            .binary_search_by(|metrics| metrics.node_id.cmp(&node_id))
            .ok()
            .map(|index| &self.node_metrics[index])
    }

    /// Number of nodes with the given total degree
    pub fn nodes_with_degree(&self, degree: usize) -> usize {
        self.degree_distribution
            .iter()
            .find(|entry| entry.degree == degree)
            .map_or(0, |entry| entry.node_count)
    }
}
