//! Depth-first and breadth-first visitors
//!
//! Both traversals follow successor edges only and visit every reachable node
//! exactly once. Sibling order follows the order of each node's successor map.

use super::{Context, GraphError, GraphResult, PersistentGraph};
use crate::value_objects::NodeId;
use std::collections::{HashSet, VecDeque};

impl<N, E> PersistentGraph<N, E> {
    /// Pre-order depth-first traversal from `start`
    pub fn depth_first_traversal<F>(&self, start: NodeId, mut visit: F) -> GraphResult<()>
    where
        F: FnMut(&Context<N, E>),
    {
        self.require_start(start)?;

        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(node_id) = stack.pop() {
            if !visited.insert(node_id) {
                continue;
            }
            let Some(context) = self.get_context(node_id) else {
                continue;
            };
            visit(context);

            // reversed so the first successor is explored first
            for successor in context.successors().keys().rev() {
                if !visited.contains(successor) {
                    stack.push(*successor);
                }
            }
        }

        Ok(())
    }

    /// Level-order breadth-first traversal from `start`
    pub fn breadth_first_traversal<F>(&self, start: NodeId, mut visit: F) -> GraphResult<()>
    where
        F: FnMut(&Context<N, E>),
    {
        self.require_start(start)?;

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(node_id) = queue.pop_front() {
            let Some(context) = self.get_context(node_id) else {
                continue;
            };
            visit(context);

            for successor in context.successors().keys() {
                if visited.insert(*successor) {
                    queue.push_back(*successor);
                }
            }
        }

        Ok(())
    }

    /// Node ids in depth-first visiting order
    pub fn depth_first_order(&self, start: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut order = Vec::new();
        self.depth_first_traversal(start, |context| order.push(context.node_id()))?;
        Ok(order)
    }

    /// Node ids in breadth-first visiting order
    pub fn breadth_first_order(&self, start: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut order = Vec::new();
        self.breadth_first_traversal(start, |context| order.push(context.node_id()))?;
        Ok(order)
    }

    fn require_start(&self, start: NodeId) -> GraphResult<()> {
        if self.contains_node(start) {
            Ok(())
        } else {
            Err(GraphError::InvalidArgument(format!(
                "start node {start} does not exist"
            )))
        }
    }
}
