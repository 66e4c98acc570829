//! Graph Aggregate
//!
//! A named, versioned graph that owns one persistent graph value. Mutations
//! replace the owned value with the new one returned by the persistent graph,
//! so any snapshot handed out earlier keeps observing the state it was taken
//! from.

use super::{EdgeRecord, GraphRecord, GraphSnapshot, NodeRecord};
use crate::commands::{GraphCommandError, GraphCommandResult};
use crate::persistent::PersistentGraph;
use crate::value_objects::{GraphId, NodeId, NodeIdGenerator};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Edge label used when a command does not name one
pub const DEFAULT_EDGE_LABEL: &str = "edge";

/// Graph aggregate for runtime operations
#[derive(Debug, Clone)]
pub struct Graph {
    /// Unique identifier for the graph
    id: GraphId,
    /// Human-readable name of the graph
    name: String,
    /// Description of the graph's purpose
    description: String,
    /// Current structure
    graph: PersistentGraph<String, String>,
    /// When the graph was created
    created_at: DateTime<Utc>,
    /// When the graph was last modified
    last_modified: DateTime<Utc>,
    /// Incremented on every applied mutation
    version: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(id: GraphId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::from_parts(id, name.into(), description.into(), PersistentGraph::new())
    }

    /// Create a new empty graph minting node ids from `id_generator`
    pub fn with_generator(
        id: GraphId,
        name: impl Into<String>,
        description: impl Into<String>,
        id_generator: Arc<dyn NodeIdGenerator>,
    ) -> Self {
        Self::from_parts(
            id,
            name.into(),
            description.into(),
            PersistentGraph::with_generator(id_generator),
        )
    }

    fn from_parts(
        id: GraphId,
        name: String,
        description: String,
        graph: PersistentGraph<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description,
            graph,
            created_at: now,
            last_modified: now,
            version: 1,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The current persistent graph value
    pub fn structure(&self) -> &PersistentGraph<String, String> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.graph.contains_node(node_id)
    }

    /// Add a node with a freshly minted id
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        let (graph, node_id) = self.graph.add_node(label.into());
        self.replace(graph);
        node_id
    }

    /// Add the edge `from -> to`
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        label: impl Into<String>,
    ) -> GraphCommandResult<()> {
        let graph = self.graph.add_edge(from, to, label.into())?;
        self.replace(graph);
        Ok(())
    }

    /// Remove a node and every edge touching it
    ///
    /// Returns `false` when the node does not exist.
    pub fn remove_node(&mut self, node_id: NodeId) -> bool {
        let decomposition = self.graph.match_node(node_id);
        if decomposition.is_empty() {
            return false;
        }
        let (_, graph) = decomposition.into_parts();
        self.replace(graph);
        true
    }

    /// Remove the edge `from -> to`
    ///
    /// Returns `false` when no such edge exists.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if self.graph.edge_label(from, to).is_none() {
            return false;
        }
        let graph = self.graph.remove_edge(from, to);
        self.replace(graph);
        true
    }

    fn replace(&mut self, graph: PersistentGraph<String, String>) {
        self.graph = graph;
        self.last_modified = Utc::now();
        self.version += 1;
    }

    /// Immutable view of the current state for readers such as the metrics pipeline
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            graph_id: self.id,
            name: self.name.clone(),
            version: self.version,
            graph: self.graph.clone(),
        }
    }

    /// Flatten into a serializable record
    pub fn to_record(&self) -> GraphRecord {
        let nodes = self
            .graph
            .sorted_node_ids()
            .into_iter()
            .filter_map(|id| {
                self.graph.get_context(id).map(|context| NodeRecord {
                    id,
                    label: context.label().clone(),
                })
            })
            .collect();

        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edges()
            .map(|(source, target, label)| EdgeRecord {
                source,
                target,
                label: label.clone(),
            })
            .collect();
        edges.sort_by_key(|edge| (edge.source, edge.target));

        GraphRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version,
            created_at: self.created_at,
            last_modified: self.last_modified,
            nodes,
            edges,
        }
    }

    /// Rebuild a graph from a persisted record, keeping the stored node ids
    pub fn from_record(record: GraphRecord) -> GraphCommandResult<Self> {
        let mut graph = PersistentGraph::new();
        for node in record.nodes {
            graph = graph.add_node_with_id(node.id, node.label)?;
        }
        for edge in record.edges {
            graph = graph
                .add_edge(edge.source, edge.target, edge.label)
                .map_err(|e| {
                    GraphCommandError::InvalidCommand(format!(
                        "corrupt graph record {}: {e}",
                        record.id
                    ))
                })?;
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            description: record.description,
            graph,
            created_at: record.created_at,
            last_modified: record.last_modified,
            version: record.version,
        })
    }
}
