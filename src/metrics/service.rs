//! Metrics computation service
//!
//! Resolves a graph snapshot, computes its [`MetricsReport`] off the async
//! executor and replaces whatever the sink stored for that graph before.

use super::{
    compute_report, DegreeDistributionEntry, GraphMetrics, MetricsError, MetricsReport,
    MetricsResult, NodeMetrics,
};
use crate::aggregate::GraphSnapshot;
use crate::config::MetricsConfig;
use crate::events::GraphSaved;
use crate::value_objects::GraphId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

/// Read access to committed graph state
#[async_trait]
pub trait GraphLookup: Send + Sync {
    /// The latest committed snapshot of a graph, if it exists
    async fn find_by_id(&self, graph_id: GraphId) -> Option<GraphSnapshot>;

    /// Whether the graph is still committed
    ///
    /// Resolves a full snapshot by default; stores that can answer from an
    /// index should override this.
    async fn contains_graph(&self, graph_id: GraphId) -> bool {
        self.find_by_id(graph_id).await.is_some()
    }
}

/// Storage for computed metrics
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Remove every record stored for a graph
    async fn delete_by_graph_id(&self, graph_id: GraphId) -> MetricsResult<()>;

    async fn save(&self, metrics: GraphMetrics) -> MetricsResult<()>;

    async fn save_node_metrics(&self, metrics: Vec<NodeMetrics>) -> MetricsResult<()>;

    async fn save_degree_distribution(
        &self,
        entries: Vec<DegreeDistributionEntry>,
    ) -> MetricsResult<()>;

    /// Supersede the stored records of the report's graph
    ///
    /// Issues delete-then-insert. Sinks able to apply the four writes
    /// atomically should override this.
    async fn replace(&self, report: &MetricsReport) -> MetricsResult<()> {
        self.delete_by_graph_id(report.graph_id()).await?;
        self.save(report.metrics.clone()).await?;
        self.save_node_metrics(report.node_metrics.clone()).await?;
        self.save_degree_distribution(report.degree_distribution.clone())
            .await
    }
}

/// Computes and stores structural metrics for graph snapshots
pub struct MetricsComputationService {
    lookup: Arc<dyn GraphLookup>,
    sink: Arc<dyn MetricsSink>,
    settle_delay: Duration,
    /// Serializes recomputations per graph
    graph_locks: Mutex<HashMap<GraphId, Arc<AsyncMutex<()>>>>,
    /// Version of the last snapshot written per graph
    written_versions: Mutex<HashMap<GraphId, u64>>,
}

impl MetricsComputationService {
    pub fn new(lookup: Arc<dyn GraphLookup>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            lookup,
            sink,
            settle_delay: MetricsConfig::default().settle_delay(),
            graph_locks: Mutex::new(HashMap::new()),
            written_versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        lookup: Arc<dyn GraphLookup>,
        sink: Arc<dyn MetricsSink>,
        config: &MetricsConfig,
    ) -> Self {
        Self::new(lookup, sink).with_settle_delay(config.settle_delay())
    }

    /// Delay applied before resolving a graph for an event without a snapshot
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Resolve the graph and recompute its metrics
    ///
    /// Fails with [`MetricsError::MissingGraph`] when the graph does not resolve.
    pub async fn compute_and_save_metrics(
        &self,
        graph_id: GraphId,
    ) -> MetricsResult<Option<MetricsReport>> {
        let snapshot = self
            .lookup
            .find_by_id(graph_id)
            .await
            .ok_or(MetricsError::MissingGraph(graph_id))?;
        self.compute_and_save_snapshot(&snapshot).await
    }

    /// Recompute metrics for an already resolved snapshot
    ///
    /// Returns `Ok(None)` when a newer version of the graph has already been
    /// written, in which case the sink is left untouched.
    pub async fn compute_and_save_snapshot(
        &self,
        snapshot: &GraphSnapshot,
    ) -> MetricsResult<Option<MetricsReport>> {
        let graph_id = snapshot.graph_id;
        let lock = self.graph_lock(graph_id);
        let result = {
            let _guard = lock.lock().await;
            self.recompute(snapshot).await
        };
        self.release_graph_lock(graph_id, &lock);
        result
    }

    /// Entry point for committed mutations; never fails
    pub async fn handle_graph_saved(&self, event: GraphSaved) {
        let graph_id = event.graph_id;
        let result = match &event.snapshot {
            Some(snapshot) => self.compute_and_save_snapshot(snapshot).await,
            None => {
                if !self.settle_delay.is_zero() {
                    tokio::time::sleep(self.settle_delay).await;
                }
                self.compute_and_save_metrics(graph_id).await
            }
        };

        match result {
            Ok(Some(report)) => debug!(
                graph_id = %graph_id,
                saved_at = %event.saved_at,
                node_count = report.metrics.node_count,
                "Metrics recomputed after graph save"
            ),
            Ok(None) => debug!(graph_id = %graph_id, "Skipped stale graph snapshot"),
            Err(MetricsError::MissingGraph(_)) => warn!(
                graph_id = %graph_id,
                saved_at = %event.saved_at,
                "Graph not found, metrics not computed"
            ),
            Err(e) => error!(graph_id = %graph_id, error = %e, "Failed to compute graph metrics"),
        }
    }

    async fn recompute(&self, snapshot: &GraphSnapshot) -> MetricsResult<Option<MetricsReport>> {
        let graph_id = snapshot.graph_id;
        if let Some(written) = self.written_versions.lock().get(&graph_id).copied() {
            if snapshot.version < written {
                debug!(
                    graph_id = %graph_id,
                    version = snapshot.version,
                    written,
                    "Newer metrics already stored"
                );
                return Ok(None);
            }
        }

        debug!(graph_id = %graph_id, version = snapshot.version, "Computing graph metrics");
        let graph = snapshot.graph.clone();
        let report = tokio::task::spawn_blocking(move || compute_report(graph_id, &graph))
            .await
            .map_err(|e| MetricsError::Computation {
                graph_id,
                reason: e.to_string(),
            })?;

        if !self.lookup.contains_graph(graph_id).await {
            self.written_versions.lock().remove(&graph_id);
            return Err(MetricsError::MissingGraph(graph_id));
        }

        self.sink.replace(&report).await?;
        self.written_versions
            .lock()
            .insert(graph_id, snapshot.version);

        info!(
            graph_id = %graph_id,
            version = snapshot.version,
            node_count = report.metrics.node_count,
            edge_count = report.metrics.edge_count,
            "Graph metrics saved"
        );
        Ok(Some(report))
    }

    fn graph_lock(&self, graph_id: GraphId) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.graph_locks.lock().entry(graph_id).or_default())
    }

    fn release_graph_lock(&self, graph_id: GraphId, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self.graph_locks.lock();
        // Only the map and the caller hold it: nobody else is waiting.
        if Arc::strong_count(lock) == 2 {
            locks.remove(&graph_id);
        }
    }
}
