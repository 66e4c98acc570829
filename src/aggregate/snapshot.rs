//! Read-side views of a graph aggregate

use crate::persistent::PersistentGraph;
use crate::value_objects::{GraphId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed graph state as seen by the metrics pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub graph_id: GraphId,
    pub name: String,
    /// Aggregate version the snapshot was taken at
    pub version: u64,
    pub graph: PersistentGraph<String, String>,
}

/// Flat, serializable form of a graph aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: GraphId,
    pub name: String,
    pub description: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub label: String,
}
