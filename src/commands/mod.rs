//! Graph commands
//!
//! Commands represent intent to modify graph state. They are processed by command
//! handlers which apply them to the aggregate, commit the result and signal the
//! metrics pipeline.

use crate::persistent::GraphError;
use crate::value_objects::{GraphId, NodeId};
use serde::{Deserialize, Serialize};

/// Commands for graph operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphCommand {
    /// Create a new, empty graph
    CreateGraph {
        /// The name of the graph
        name: String,
        /// A description of the graph's purpose
        description: String,
    },

    /// Add a node to a graph
    AddNode {
        /// The graph to add the node to
        graph_id: GraphId,
        /// The label of the new node
        label: String,
    },

    /// Remove a node and all of its edges
    RemoveNode {
        graph_id: GraphId,
        node_id: NodeId,
    },

    /// Add a directed edge between two existing nodes
    AddEdge {
        /// The graph to add the edge to
        graph_id: GraphId,
        /// The source node of the edge
        source_id: NodeId,
        /// The target node of the edge
        target_id: NodeId,
        /// Edge label, the default label when absent
        label: Option<String>,
    },

    /// Remove a directed edge
    RemoveEdge {
        graph_id: GraphId,
        source_id: NodeId,
        target_id: NodeId,
    },
}

impl GraphCommand {
    /// The graph this command targets, `None` for graph creation
    pub fn graph_id(&self) -> Option<GraphId> {
        match self {
            GraphCommand::CreateGraph { .. } => None,
            GraphCommand::AddNode { graph_id, .. }
            | GraphCommand::RemoveNode { graph_id, .. }
            | GraphCommand::AddEdge { graph_id, .. }
            | GraphCommand::RemoveEdge { graph_id, .. } => Some(*graph_id),
        }
    }
}

/// What a successfully handled command changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphCommandOutcome {
    GraphCreated { graph_id: GraphId },
    NodeAdded { graph_id: GraphId, node_id: NodeId },
    NodeRemoved { graph_id: GraphId, node_id: NodeId },
    EdgeAdded { graph_id: GraphId, source_id: NodeId, target_id: NodeId },
    EdgeRemoved { graph_id: GraphId, source_id: NodeId, target_id: NodeId },
    /// The command referred to something absent and changed nothing
    Unchanged { graph_id: GraphId },
}

impl GraphCommandOutcome {
    pub fn graph_id(&self) -> GraphId {
        match self {
            GraphCommandOutcome::GraphCreated { graph_id }
            | GraphCommandOutcome::NodeAdded { graph_id, .. }
            | GraphCommandOutcome::NodeRemoved { graph_id, .. }
            | GraphCommandOutcome::EdgeAdded { graph_id, .. }
            | GraphCommandOutcome::EdgeRemoved { graph_id, .. }
            | GraphCommandOutcome::Unchanged { graph_id } => *graph_id,
        }
    }

    /// Whether the command produced a new graph state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, GraphCommandOutcome::Unchanged { .. })
    }
}

/// Result type for graph operations
pub type GraphCommandResult<T> = Result<T, GraphCommandError>;

/// Errors that can occur during graph command processing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphCommandError {
    #[error("Graph not found: {0}")]
    GraphNotFound(GraphId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(
        "Graph {graph_id} was modified concurrently: \
         stored version {stored}, attempted {attempted}"
    )]
    VersionConflict {
        graph_id: GraphId,
        stored: u64,
        attempted: u64,
    },

    #[error("Repository error: {0}")]
    Repository(String),
}
