//! Conversion into petgraph structures for rendering and external algorithms

use super::PersistentGraph;
use crate::value_objects::NodeId;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

impl<N: Clone, E: Clone> PersistentGraph<N, E> {
    /// Copy this graph into a petgraph `DiGraph`
    ///
    /// Nodes are inserted in ascending id order so the resulting indices are stable
    /// for a given graph value. The returned map resolves node ids to indices.
    pub fn to_petgraph(&self) -> (DiGraph<N, E>, HashMap<NodeId, NodeIndex>) {
        let node_ids = self.sorted_node_ids();
        let mut graph = DiGraph::with_capacity(node_ids.len(), self.edge_count());
        let mut indices = HashMap::with_capacity(node_ids.len());

        for node_id in &node_ids {
            if let Some(context) = self.get_context(*node_id) {
                indices.insert(*node_id, graph.add_node(context.label().clone()));
            }
        }

        for node_id in &node_ids {
            let Some(context) = self.get_context(*node_id) else {
                continue;
            };
            for (target, label) in context.successors() {
                if let (Some(source), Some(target)) = (indices.get(node_id), indices.get(target)) {
                    graph.add_edge(*source, *target, label.clone());
                }
            }
        }

        (graph, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::connected_components;

    #[test]
    fn test_export_preserves_counts_and_edges() {
        let graph: PersistentGraph<String, u32> = PersistentGraph::new();
        let (graph, a) = graph.add_node("a".to_string());
        let (graph, b) = graph.add_node("b".to_string());
        let (graph, c) = graph.add_node("c".to_string());
        let graph = graph.add_edge(a, b, 1).unwrap().add_edge(b, a, 2).unwrap();

        let (exported, indices) = graph.to_petgraph();

        assert_eq!(exported.node_count(), 3);
        assert_eq!(exported.edge_count(), 2);
        assert_eq!(exported[indices[&c]], "c");

        let edge = exported.find_edge(indices[&b], indices[&a]).unwrap();
        assert_eq!(exported[edge], 2);
        assert_eq!(connected_components(&exported), 2);
    }
}
