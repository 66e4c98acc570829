//! Metric algorithms over a single graph snapshot
//!
//! Connectivity treats edges as undirected. Distances, path metrics and the
//! centralities follow edge direction, so a weakly connected graph may still have
//! ordered pairs with no directed path; those pairs are left out of the averages
//! and never contribute to the diameter.
//!
//! Betweenness is the simplified pair-counting form: a node scores one point for
//! every ordered pair it lies on *some* shortest path between, however many
//! shortest paths there are.

use super::{DegreeDistributionEntry, GraphMetrics, MetricsReport, NodeMetrics};
use crate::persistent::PersistentGraph;
use crate::value_objects::{GraphId, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Weak connectivity of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityResult {
    pub is_connected: bool,
    pub component_count: usize,
}

/// Shortest-path summary over all directed-reachable ordered pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathMetrics {
    pub diameter: usize,
    pub average_path_length: f64,
}

/// Directed hop distances from one source to every node it reaches
type Distances = HashMap<NodeId, usize>;

/// Precomputed all-pairs view of one graph snapshot
pub struct GraphAnalysis<'a, N, E> {
    graph: &'a PersistentGraph<N, E>,
    node_ids: Vec<NodeId>,
    distances: HashMap<NodeId, Distances>,
}

impl<'a, N, E> GraphAnalysis<'a, N, E> {
    /// Run a directed BFS from every node of `graph`
    pub fn new(graph: &'a PersistentGraph<N, E>) -> Self {
        let node_ids = graph.sorted_node_ids();
        let distances = node_ids
            .iter()
            .map(|source| (*source, bfs_distances(graph, *source)))
            .collect();

        Self {
            graph,
            node_ids,
            distances,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Node ids in ascending order
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Directed hop distance, `None` when `to` is unreachable from `from`
    pub fn distance(&self, from: NodeId, to: NodeId) -> Option<usize> {
        self.distances.get(&from)?.get(&to).copied()
    }

    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        self.graph.edge_count() as f64 / (n as f64 * (n - 1) as f64)
    }

    pub fn average_degree(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        2.0 * self.graph.edge_count() as f64 / n as f64
    }

    /// Count weakly connected components with an undirected BFS
    pub fn connectivity(&self) -> ConnectivityResult {
        if self.node_ids.is_empty() {
            return ConnectivityResult {
                is_connected: true,
                component_count: 0,
            };
        }

        let mut visited = HashSet::with_capacity(self.node_ids.len());
        let mut component_count = 0;

        for start in &self.node_ids {
            if visited.insert(*start) {
                component_count += 1;
                self.flood_undirected(*start, &mut visited);
            }
        }

        ConnectivityResult {
            is_connected: component_count == 1,
            component_count,
        }
    }

    fn flood_undirected(&self, start: NodeId, visited: &mut HashSet<NodeId>) {
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let Some(context) = self.graph.get_context(current) else {
                continue;
            };
            let neighbours = context
                .successors()
                .keys()
                .chain(context.predecessors().keys());
            for neighbour in neighbours {
                if visited.insert(*neighbour) {
                    queue.push_back(*neighbour);
                }
            }
        }
    }

    /// Diameter and average shortest path length over reachable ordered pairs
    pub fn path_metrics(&self) -> PathMetrics {
        let mut diameter = 0;
        let mut total = 0usize;
        let mut pairs = 0usize;

        for (source, reachable) in &self.distances {
            for (target, distance) in reachable {
                if target == source {
                    continue;
                }
                diameter = diameter.max(*distance);
                total += distance;
                pairs += 1;
            }
        }

        let average_path_length = if pairs > 0 {
            total as f64 / pairs as f64
        } else {
            0.0
        };

        PathMetrics {
            diameter,
            average_path_length,
        }
    }

    /// Simplified betweenness of every node, normalized by `(n-1)(n-2)`
    pub fn betweenness_centralities(&self) -> HashMap<NodeId, f64> {
        let mut scores: HashMap<NodeId, f64> =
            self.node_ids.iter().map(|id| (*id, 0.0)).collect();

        let n = self.node_count();
        if n <= 2 {
            return scores;
        }

        for s in &self.node_ids {
            for t in &self.node_ids {
                if s == t {
                    continue;
                }
                let Some(d_st) = self.distance(*s, *t).filter(|d| *d > 0) else {
                    continue;
                };

                for v in &self.node_ids {
                    if v == s || v == t {
                        continue;
                    }
                    let on_shortest_path = match (self.distance(*s, *v), self.distance(*v, *t)) {
                        (Some(d_sv), Some(d_vt)) => d_sv + d_vt == d_st,
                        _ => false,
                    };
                    if on_shortest_path {
                        if let Some(score) = scores.get_mut(v) {
                            *score += 1.0;
                        }
                    }
                }
            }
        }

        let norm = ((n - 1) * (n - 2)) as f64;
        for score in scores.values_mut() {
            *score /= norm;
        }
        scores
    }

    /// Reachable node count divided by the sum of distances to them
    pub fn closeness_centrality(&self, node_id: NodeId) -> f64 {
        if self.node_count() <= 1 {
            return 0.0;
        }
        let Some(reachable) = self.distances.get(&node_id) else {
            return 0.0;
        };

        let (count, total) = reachable
            .iter()
            .filter(|(target, _)| **target != node_id)
            .fold((0usize, 0usize), |(count, total), (_, distance)| {
                (count + 1, total + distance)
            });

        if count == 0 || total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    /// Total degree normalized by the directed maximum `2(n-1)`
    pub fn degree_centrality(&self, node_id: NodeId) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        self.graph.get_context(node_id).map_or(0.0, |context| {
            (context.in_degree() + context.out_degree()) as f64 / (2.0 * (n - 1) as f64)
        })
    }

    /// Fraction of possible directed edges present among a node's neighbours
    pub fn local_clustering_coefficient(&self, node_id: NodeId) -> f64 {
        let Some(context) = self.graph.get_context(node_id) else {
            return 0.0;
        };

        let neighbours: HashSet<NodeId> = context
            .predecessors()
            .keys()
            .chain(context.successors().keys())
            .copied()
            .collect();

        let k = neighbours.len();
        if k < 2 {
            return 0.0;
        }

        let linked = neighbours
            .iter()
            .filter_map(|neighbour| self.graph.get_context(*neighbour))
            .map(|neighbour| {
                neighbour
                    .successors()
                    .keys()
                    .filter(|target| {
                        **target != neighbour.node_id() && neighbours.contains(*target)
                    })
                    .count()
            })
            .sum::<usize>();

        linked as f64 / (k * (k - 1)) as f64
    }

    pub fn average_clustering_coefficient(&self) -> f64 {
        if self.node_ids.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .node_ids
            .iter()
            .map(|id| self.local_clustering_coefficient(*id))
            .sum();
        total / self.node_count() as f64
    }

    /// Histogram of total degree to node count, ordered by degree
    pub fn degree_distribution(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for context in self.graph.contexts() {
            *histogram
                .entry(context.in_degree() + context.out_degree())
                .or_insert(0) += 1;
        }
        histogram
    }

    /// Aggregate metrics record for `graph_id`
    pub fn graph_metrics(&self, graph_id: GraphId) -> GraphMetrics {
        let connectivity = self.connectivity();
        let path =
            (connectivity.is_connected && self.node_count() > 1).then(|| self.path_metrics());

        GraphMetrics {
            graph_id,
            node_count: self.node_count(),
            edge_count: self.graph.edge_count(),
            density: self.density(),
            average_degree: self.average_degree(),
            is_connected: connectivity.is_connected,
            component_count: connectivity.component_count,
            diameter: path.map(|p| p.diameter),
            average_path_length: path.map(|p| p.average_path_length),
            average_clustering_coefficient: self.average_clustering_coefficient(),
            computed_at: chrono::Utc::now(),
        }
    }

    /// Per-node metrics records ordered by node id
    pub fn node_metrics(&self, graph_id: GraphId) -> Vec<NodeMetrics> {
        let betweenness = self.betweenness_centralities();

        self.node_ids
            .iter()
            .filter_map(|node_id| {
                let context = self.graph.get_context(*node_id)?;
                Some(NodeMetrics {
                    graph_id,
                    node_id: *node_id,
                    in_degree: context.in_degree(),
                    out_degree: context.out_degree(),
                    degree_centrality: self.degree_centrality(*node_id),
                    betweenness_centrality: betweenness.get(node_id).copied().unwrap_or(0.0),
                    closeness_centrality: self.closeness_centrality(*node_id),
                    clustering_coefficient: self.local_clustering_coefficient(*node_id),
                })
            })
            .collect()
    }

    /// Degree distribution records ordered by degree
    pub fn degree_distribution_entries(&self, graph_id: GraphId) -> Vec<DegreeDistributionEntry> {
        self.degree_distribution()
            .into_iter()
            .map(|(degree, node_count)| DegreeDistributionEntry {
                graph_id,
                degree,
                node_count,
            })
            .collect()
    }
}

/// Compute every metric record for one graph snapshot
pub fn compute_report<N, E>(graph_id: GraphId, graph: &PersistentGraph<N, E>) -> MetricsReport {
    let analysis = GraphAnalysis::new(graph);
    MetricsReport {
        metrics: analysis.graph_metrics(graph_id),
        node_metrics: analysis.node_metrics(graph_id),
        degree_distribution: analysis.degree_distribution_entries(graph_id),
    }
}

fn bfs_distances<N, E>(graph: &PersistentGraph<N, E>, source: NodeId) -> Distances {
    let mut distances = HashMap::from([(source, 0)]);
    let mut queue = VecDeque::from([source]);

    while let Some(current) = queue.pop_front() {
        let Some(context) = graph.get_context(current) else {
            continue;
        };
        let next = distances[&current] + 1;
        for successor in context.successors().keys() {
            if !distances.contains_key(successor) {
                distances.insert(*successor, next);
                queue.push_back(*successor);
            }
        }
    }

    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    fn build(
        labels: &[&str],
        edges: &[(usize, usize)],
    ) -> (PersistentGraph<String, String>, Vec<NodeId>) {
        let mut graph = PersistentGraph::new();
        let mut ids = Vec::new();
        for label in labels {
            let (next, id) = graph.add_node(label.to_string());
            graph = next;
            ids.push(id);
        }
        for (from, to) in edges {
            graph = graph.add_edge(ids[*from], ids[*to], "edge".to_string()).unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn test_triangle() {
        let (graph, ids) = build(&["a", "b", "c"], &[(0, 1), (1, 2), (2, 0)]);
        let report = compute_report(GraphId::new(), &graph);
        let metrics = &report.metrics;

        assert_eq!(metrics.node_count, 3);
        assert_eq!(metrics.edge_count, 3);
        assert_close(metrics.density, 0.5);
        assert_close(metrics.average_degree, 2.0);
        assert!(metrics.is_connected);
        assert_eq!(metrics.component_count, 1);
        assert_eq!(metrics.diameter, Some(2));
        assert_close(metrics.average_path_length.unwrap(), 1.5);
        assert_close(metrics.average_clustering_coefficient, 0.5);

        for id in &ids {
            let node = report.node(*id).unwrap();
            assert_eq!(node.in_degree, 1);
            assert_eq!(node.out_degree, 1);
            assert_close(node.degree_centrality, 0.5);
            assert_close(node.betweenness_centrality, 0.5);
            assert_close(node.closeness_centrality, 2.0 / 3.0);
            assert_close(node.clustering_coefficient, 0.5);
        }
    }

    #[test]
    fn test_isolated_nodes() {
        let (graph, _) = build(&["a", "b", "c"], &[]);
        let report = compute_report(GraphId::new(), &graph);
        let metrics = &report.metrics;

        assert_eq!(metrics.node_count, 3);
        assert_eq!(metrics.edge_count, 0);
        assert!(!metrics.is_connected);
        assert_eq!(metrics.component_count, 3);
        assert_eq!(metrics.diameter, None);
        assert_eq!(metrics.average_path_length, None);
        assert_eq!(report.nodes_with_degree(0), 3);
    }

    #[test]
    fn test_star() {
        let (graph, ids) = build(&["center", "leaf1", "leaf2"], &[(0, 1), (0, 2)]);
        let report = compute_report(GraphId::new(), &graph);

        let center = report.node(ids[0]).unwrap();
        assert_eq!(center.out_degree, 2);
        assert_eq!(center.in_degree, 0);
        assert_close(center.degree_centrality, 0.5);
        assert_close(center.closeness_centrality, 1.0);
        assert_close(center.clustering_coefficient, 0.0);

        for leaf in &ids[1..] {
            let leaf = report.node(*leaf).unwrap();
            assert_eq!(leaf.in_degree, 1);
            assert_eq!(leaf.out_degree, 0);
            assert_close(leaf.closeness_centrality, 0.0);
            assert_close(leaf.betweenness_centrality, 0.0);
        }

        assert_eq!(report.nodes_with_degree(1), 2);
        assert_eq!(report.nodes_with_degree(2), 1);
        assert_eq!(report.degree_distribution.len(), 2);

        // weakly connected, but leaves reach nothing
        assert!(report.metrics.is_connected);
        assert_eq!(report.metrics.diameter, Some(1));
        assert_close(report.metrics.average_path_length.unwrap(), 1.0);
    }

    #[test]
    fn test_directed_path_betweenness() {
        let (graph, ids) = build(&["a", "b", "c"], &[(0, 1), (1, 2)]);
        let analysis = GraphAnalysis::new(&graph);
        let betweenness = analysis.betweenness_centralities();

        assert_close(betweenness[&ids[0]], 0.0);
        assert_close(betweenness[&ids[1]], 0.5);
        assert_close(betweenness[&ids[2]], 0.0);

        assert_eq!(analysis.distance(ids[0], ids[2]), Some(2));
        assert_eq!(analysis.distance(ids[2], ids[0]), None);

        let path = analysis.path_metrics();
        assert_eq!(path.diameter, 2);
        assert_close(path.average_path_length, 4.0 / 3.0);

        assert_close(analysis.closeness_centrality(ids[0]), 2.0 / 3.0);
        assert_close(analysis.closeness_centrality(ids[1]), 1.0);
        assert_close(analysis.closeness_centrality(ids[2]), 0.0);
    }

    #[test]
    fn test_betweenness_counts_a_node_once_per_pair() {
        // two shortest paths a -> b -> d and a -> c -> d
        let (graph, ids) = build(&["a", "b", "c", "d"], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let betweenness = GraphAnalysis::new(&graph).betweenness_centralities();

        // one pair (a, d), normalized by 3 * 2
        assert_close(betweenness[&ids[1]], 1.0 / 6.0);
        assert_close(betweenness[&ids[2]], 1.0 / 6.0);
        assert_close(betweenness[&ids[0]], 0.0);
        assert_close(betweenness[&ids[3]], 0.0);
    }

    #[test]
    fn test_empty_graph() {
        let graph: PersistentGraph<String, String> = PersistentGraph::new();
        let report = compute_report(GraphId::new(), &graph);

        assert!(report.metrics.is_connected);
        assert_eq!(report.metrics.component_count, 0);
        assert_close(report.metrics.density, 0.0);
        assert_close(report.metrics.average_degree, 0.0);
        assert_close(report.metrics.average_clustering_coefficient, 0.0);
        assert_eq!(report.metrics.diameter, None);
        assert!(report.node_metrics.is_empty());
        assert!(report.degree_distribution.is_empty());
    }

    #[test]
    fn test_single_node() {
        let (graph, ids) = build(&["only"], &[]);
        let report = compute_report(GraphId::new(), &graph);

        assert!(report.metrics.is_connected);
        assert_eq!(report.metrics.component_count, 1);
        assert_eq!(report.metrics.diameter, None);
        assert_eq!(report.metrics.average_path_length, None);

        let node = report.node(ids[0]).unwrap();
        assert_close(node.degree_centrality, 0.0);
        assert_close(node.closeness_centrality, 0.0);
        assert_close(node.betweenness_centrality, 0.0);
    }

    #[test]
    fn test_clustering_with_mutual_neighbours() {
        // centre x linked to y and z, which point at each other both ways
        let (graph, ids) = build(&["x", "y", "z"], &[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let analysis = GraphAnalysis::new(&graph);

        assert_close(analysis.local_clustering_coefficient(ids[0]), 1.0);
        // y's neighbours are x and z; only x -> z exists among them
        assert_close(analysis.local_clustering_coefficient(ids[1]), 0.5);
    }

    #[test]
    fn test_two_components() {
        let (graph, _) = build(&["a", "b", "c", "d"], &[(0, 1), (3, 2)]);
        let connectivity = GraphAnalysis::new(&graph).connectivity();

        assert!(!connectivity.is_connected);
        assert_eq!(connectivity.component_count, 2);
    }

    #[test]
    fn test_report_orders_records() {
        let (graph, _) = build(&["a", "b", "c", "d"], &[(0, 1), (0, 2), (0, 3), (1, 2)]);
        let report = compute_report(GraphId::new(), &graph);

        assert!(report
            .node_metrics
            .windows(2)
            .all(|pair| pair[0].node_id < pair[1].node_id));
        assert!(report
            .degree_distribution
            .windows(2)
            .all(|pair| pair[0].degree < pair[1].degree));
        let total: usize = report.degree_distribution.iter().map(|e| e.node_count).sum();
        assert_eq!(total, 4);
    }
}
