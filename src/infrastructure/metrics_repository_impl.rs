//! In-memory metrics store

use crate::{
    metrics::{
        DegreeDistributionEntry, GraphMetrics, MetricsReport, MetricsResult, MetricsSink,
        NodeMetrics,
    },
    GraphId, NodeId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MetricsTables {
    graph_metrics: HashMap<GraphId, GraphMetrics>,
    node_metrics: HashMap<GraphId, Vec<NodeMetrics>>,
    degree_distribution: HashMap<GraphId, Vec<DegreeDistributionEntry>>,
}

impl MetricsTables {
    fn delete(&mut self, graph_id: GraphId) {
        self.graph_metrics.remove(&graph_id);
        self.node_metrics.remove(&graph_id);
        self.degree_distribution.remove(&graph_id);
    }

    fn insert_node_metrics(&mut self, metrics: Vec<NodeMetrics>) {
        for node in metrics {
            self.node_metrics.entry(node.graph_id).or_default().push(node);
        }
    }

    fn insert_degree_distribution(&mut self, entries: Vec<DegreeDistributionEntry>) {
        for entry in entries {
            self.degree_distribution
                .entry(entry.graph_id)
                .or_default()
                .push(entry);
        }
    }
}

/// Metrics sink and query side kept in memory
///
/// All three record sets live behind one lock, so [`MetricsSink::replace`]
/// is atomic to readers.
#[derive(Default)]
pub struct InMemoryMetricsStore {
    tables: RwLock<MetricsTables>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_metrics(&self, graph_id: GraphId) -> Option<GraphMetrics> {
        self.tables.read().await.graph_metrics.get(&graph_id).cloned()
    }

    pub async fn find_node_metrics(&self, graph_id: GraphId) -> Vec<NodeMetrics> {
        self.tables
            .read()
            .await
            .node_metrics
            .get(&graph_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn find_node_metric(
        &self,
        graph_id: GraphId,
        node_id: NodeId,
    ) -> Option<NodeMetrics> {
        self.tables
            .read()
            .await
            .node_metrics
            .get(&graph_id)
            .and_then(|nodes| nodes.iter().find(|node| node.node_id == node_id).cloned())
    }

    pub async fn find_degree_distribution(
        &self,
        graph_id: GraphId,
    ) -> Vec<DegreeDistributionEntry> {
        self.tables
            .read()
            .await
            .degree_distribution
            .get(&graph_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All three record sets of a graph, read under one guard
    pub async fn find_report(&self, graph_id: GraphId) -> Option<MetricsReport> {
        let tables = self.tables.read().await;
        let metrics = tables.graph_metrics.get(&graph_id)?.clone();
        Some(MetricsReport {
            metrics,
            node_metrics: tables.node_metrics.get(&graph_id).cloned().unwrap_or_default(),
            degree_distribution: tables
                .degree_distribution
                .get(&graph_id)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetricsStore {
    async fn delete_by_graph_id(&self, graph_id: GraphId) -> MetricsResult<()> {
        self.tables.write().await.delete(graph_id);
        Ok(())
    }

    async fn save(&self, metrics: GraphMetrics) -> MetricsResult<()> {
        self.tables
            .write()
            .await
            .graph_metrics
            .insert(metrics.graph_id, metrics);
        Ok(())
    }

    async fn save_node_metrics(&self, metrics: Vec<NodeMetrics>) -> MetricsResult<()> {
        self.tables.write().await.insert_node_metrics(metrics);
        Ok(())
    }

    async fn save_degree_distribution(
        &self,
        entries: Vec<DegreeDistributionEntry>,
    ) -> MetricsResult<()> {
        self.tables.write().await.insert_degree_distribution(entries);
        Ok(())
    }

    async fn replace(&self, report: &MetricsReport) -> MetricsResult<()> {
        let mut tables = self.tables.write().await;
        tables.delete(report.graph_id());
        tables
            .graph_metrics
            .insert(report.graph_id(), report.metrics.clone());
        tables.insert_node_metrics(report.node_metrics.clone());
        tables.insert_degree_distribution(report.degree_distribution.clone());
        Ok(())
    }
}
