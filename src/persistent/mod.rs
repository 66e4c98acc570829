//! Persistent inductive graph
//!
//! A [`PersistentGraph`] is an immutable mapping from [`NodeId`] to the node's
//! [`Context`]: its label plus its incoming and outgoing adjacency. Every
//! operation returns a new graph value and leaves the receiver untouched, so a
//! value can be shared freely between threads and read without locking.
//!
//! Two invariants hold for every value reachable through this API:
//!
//! - adjacency is bidirectional: `U` lists successor `(V, L)` exactly when `V`
//!   lists predecessor `(U, L)`;
//! - the graph is closed: no context names a node that is absent from the value.
//!
//! The graph is built inductively. [`PersistentGraph::match_node`] splits a node's
//! context from the rest of the graph and [`PersistentGraph::compose`] puts it
//! back.

use crate::value_objects::{NodeId, NodeIdGenerator, TimeOrderedIdGenerator};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod export;
mod traversal;

/// Errors raised by graph operations whose preconditions were violated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node {0} already exists in the graph")]
    DuplicateIdentity(NodeId),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Adjacency map from neighbour id to edge label
pub type Adjacency<E> = IndexMap<NodeId, E>;

/// A node's complete local view of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Context<N, E> {
    node_id: NodeId,
    label: N,
    predecessors: Adjacency<E>,
    successors: Adjacency<E>,
}

impl<N, E> Context<N, E> {
    /// Create a context from its parts
    pub fn new(
        node_id: NodeId,
        label: N,
        predecessors: Adjacency<E>,
        successors: Adjacency<E>,
    ) -> Self {
        Self {
            node_id,
            label,
            predecessors,
            successors,
        }
    }

    /// Context of a node without any edges
    pub fn isolated(node_id: NodeId, label: N) -> Self {
        Self::new(node_id, label, IndexMap::new(), IndexMap::new())
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn label(&self) -> &N {
        &self.label
    }

    /// Incoming edges keyed by source node
    pub fn predecessors(&self) -> &Adjacency<E> {
        &self.predecessors
    }

    /// Outgoing edges keyed by target node
    pub fn successors(&self) -> &Adjacency<E> {
        &self.successors
    }

    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }

    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }

    /// Split the context into its parts
    pub fn into_parts(self) -> (NodeId, N, Adjacency<E>, Adjacency<E>) {
        (self.node_id, self.label, self.predecessors, self.successors)
    }
}

/// One node's context paired with the graph that remains without it
#[derive(Debug, Clone)]
pub struct Decomposition<N, E> {
    context: Option<Context<N, E>>,
    graph: PersistentGraph<N, E>,
}

impl<N, E> Decomposition<N, E> {
    /// The extracted context, absent when the matched node did not exist
    pub fn context(&self) -> Option<&Context<N, E>> {
        self.context.as_ref()
    }

    /// The remaining graph
    pub fn graph(&self) -> &PersistentGraph<N, E> {
        &self.graph
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_none()
    }

    pub fn into_parts(self) -> (Option<Context<N, E>>, PersistentGraph<N, E>) {
        (self.context, self.graph)
    }
}

type NodeTable<N, E> = HashMap<NodeId, Arc<Context<N, E>>>;

/// Immutable directed graph with labelled nodes and edges
pub struct PersistentGraph<N, E> {
    nodes: Arc<NodeTable<N, E>>,
    id_generator: Arc<dyn NodeIdGenerator>,
}

impl<N, E> Clone for PersistentGraph<N, E> {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
            id_generator: Arc::clone(&self.id_generator),
        }
    }
}

impl<N, E> Default for PersistentGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> PersistentGraph<N, E> {
    /// Create an empty graph minting identifiers from OS entropy
    pub fn new() -> Self {
        Self::with_generator(Arc::new(TimeOrderedIdGenerator::from_os_entropy()))
    }

    /// Create an empty graph minting identifiers from `id_generator`
    pub fn with_generator(id_generator: Arc<dyn NodeIdGenerator>) -> Self {
        Self {
            nodes: Arc::new(HashMap::new()),
            id_generator,
        }
    }

    fn from_table(&self, nodes: NodeTable<N, E>) -> Self {
        Self {
            nodes: Arc::new(nodes),
            id_generator: Arc::clone(&self.id_generator),
        }
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn get_context(&self, node_id: NodeId) -> Option<&Context<N, E>> {
        self.nodes.get(&node_id).map(Arc::as_ref)
    }

    /// Identifiers of every node, in no particular order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Identifiers of every node in ascending order
    pub fn sorted_node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context<N, E>> + '_ {
        self.nodes.values().map(Arc::as_ref)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct directed edges
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|context| context.successors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every edge as `(source, target, label)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &E)> + '_ {
        self.nodes.values().flat_map(|context| {
            let source = context.node_id;
            context
                .successors
                .iter()
                .map(move |(target, label)| (source, *target, label))
        })
    }

    /// Label of the edge `from -> to`, if present
    pub fn edge_label(&self, from: NodeId, to: NodeId) -> Option<&E> {
        self.nodes.get(&from)?.successors.get(&to)
    }
}

impl<N: Clone, E: Clone> PersistentGraph<N, E> {
    /// Add a node under a freshly minted identifier
    pub fn add_node(&self, label: N) -> (Self, NodeId) {
        let mut node_id = self.id_generator.generate();
        while self.nodes.contains_key(&node_id) {
            node_id = self.id_generator.generate();
        }

        let mut nodes = (*self.nodes).clone();
        nodes.insert(node_id, Arc::new(Context::isolated(node_id, label)));
        (self.from_table(nodes), node_id)
    }

    /// Add a node under a caller-supplied identifier
    ///
    /// Used when rebuilding a graph from external storage.
    pub fn add_node_with_id(&self, node_id: NodeId, label: N) -> GraphResult<Self> {
        if self.nodes.contains_key(&node_id) {
            return Err(GraphError::DuplicateIdentity(node_id));
        }

        let mut nodes = (*self.nodes).clone();
        nodes.insert(node_id, Arc::new(Context::isolated(node_id, label)));
        Ok(self.from_table(nodes))
    }

    /// Add the edge `from -> to`, replacing the label of an existing edge
    pub fn add_edge(&self, from: NodeId, to: NodeId, label: E) -> GraphResult<Self> {
        if !self.contains_node(from) || !self.contains_node(to) {
            return Err(GraphError::InvalidArgument(format!(
                "both endpoints must exist in the graph (from {from}, to {to})"
            )));
        }

        let mut nodes = (*self.nodes).clone();
        update_context(&mut nodes, from, |context| {
            context.successors.insert(to, label.clone());
        });
        update_context(&mut nodes, to, |context| {
            context.predecessors.insert(from, label);
        });
        Ok(self.from_table(nodes))
    }

    /// Remove the edge `from -> to`
    ///
    /// Returns the graph unchanged when either endpoint is absent.
    pub fn remove_edge(&self, from: NodeId, to: NodeId) -> Self {
        if !self.contains_node(from) || !self.contains_node(to) {
            return self.clone();
        }

        let mut nodes = (*self.nodes).clone();
        update_context(&mut nodes, from, |context| {
            context.successors.shift_remove(&to);
        });
        update_context(&mut nodes, to, |context| {
            context.predecessors.shift_remove(&from);
        });
        self.from_table(nodes)
    }

    /// Decompose the graph around `node_id`
    ///
    /// When the node is absent the decomposition is empty and carries this graph.
    pub fn match_node(&self, node_id: NodeId) -> Decomposition<N, E> {
        let Some(context) = self.nodes.get(&node_id) else {
            return Decomposition {
                context: None,
                graph: self.clone(),
            };
        };

        let mut nodes = (*self.nodes).clone();
        nodes.remove(&node_id);
        detach(&mut nodes, context);

        Decomposition {
            context: Some(Context::clone(context)),
            graph: self.from_table(nodes),
        }
    }

    /// Insert `context` and link it into every neighbour it names
    ///
    /// Neighbours that do not exist in this graph are skipped and dropped from the
    /// stored context. Composing an identifier that is already present replaces
    /// that node together with its edges.
    pub fn compose(&self, context: Context<N, E>) -> Self {
        let (node_id, label, predecessors, successors) = context.into_parts();
        let mut nodes = (*self.nodes).clone();

        if let Some(existing) = nodes.remove(&node_id) {
            detach(&mut nodes, &existing);
        }

        let is_linkable =
            |neighbour: &NodeId| *neighbour == node_id || nodes.contains_key(neighbour);
        let predecessors: Adjacency<E> = predecessors
            .into_iter()
            .filter(|(neighbour, _)| is_linkable(neighbour))
            .collect();
        let successors: Adjacency<E> = successors
            .into_iter()
            .filter(|(neighbour, _)| is_linkable(neighbour))
            .collect();

        for (neighbour, label) in &predecessors {
            if *neighbour != node_id {
                update_context(&mut nodes, *neighbour, |context| {
                    context.successors.insert(node_id, label.clone());
                });
            }
        }
        for (neighbour, label) in &successors {
            if *neighbour != node_id {
                update_context(&mut nodes, *neighbour, |context| {
                    context.predecessors.insert(node_id, label.clone());
                });
            }
        }

        nodes.insert(
            node_id,
            Arc::new(Context::new(node_id, label, predecessors, successors)),
        );
        self.from_table(nodes)
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&self, node_id: NodeId) -> Self {
        self.match_node(node_id).graph
    }
}

/// Copy-on-write update of one context in a node table
fn update_context<N: Clone, E: Clone>(
    nodes: &mut NodeTable<N, E>,
    node_id: NodeId,
    update: impl FnOnce(&mut Context<N, E>),
) {
    if let Some(context) = nodes.get_mut(&node_id) {
        update(Arc::make_mut(context));
    }
}

/// Strip every reference to `context`'s node from its neighbours
fn detach<N: Clone, E: Clone>(nodes: &mut NodeTable<N, E>, context: &Context<N, E>) {
    let node_id = context.node_id;
    for predecessor in context.predecessors.keys() {
        update_context(nodes, *predecessor, |neighbour| {
            neighbour.successors.shift_remove(&node_id);
        });
    }
    for successor in context.successors.keys() {
        update_context(nodes, *successor, |neighbour| {
            neighbour.predecessors.shift_remove(&node_id);
        });
    }
}

impl<N: PartialEq, E: PartialEq> PartialEq for PersistentGraph<N, E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes) || self.nodes == other.nodes
    }
}

impl<N: fmt::Debug, E: fmt::Debug> fmt::Debug for PersistentGraph<N, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentGraph")
            .field("node_count", &self.node_count())
            .field("nodes", &self.nodes)
            .finish()
    }
}
