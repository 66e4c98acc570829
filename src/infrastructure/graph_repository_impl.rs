//! In-memory graph repository
//!
//! Graphs are kept in their flat [`GraphRecord`] form and rebuilt on load, the
//! way a persistent store would hand them back.

use crate::{
    aggregate::{Graph, GraphRecord, GraphSnapshot},
    commands::{GraphCommandError, GraphCommandResult},
    handlers::GraphRepository,
    metrics::GraphLookup,
    GraphId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Graph repository backed by a map of records
#[derive(Default)]
pub struct InMemoryGraphRepository {
    graphs: RwLock<HashMap<GraphId, GraphRecord>>,
}

impl InMemoryGraphRepository {
    /// Create a new, empty repository
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.graphs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.graphs.read().await.is_empty()
    }

    fn rebuild(record: GraphRecord) -> GraphCommandResult<Graph> {
        let graph_id = record.id;
        Graph::from_record(record).map_err(|e| {
            GraphCommandError::Repository(format!("failed to rebuild graph {graph_id}: {e}"))
        })
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn save(&self, graph: &Graph) -> GraphCommandResult<()> {
        let mut graphs = self.graphs.write().await;
        if let Some(stored) = graphs.get(&graph.id()) {
            if stored.version >= graph.version() {
                return Err(GraphCommandError::VersionConflict {
                    graph_id: graph.id(),
                    stored: stored.version,
                    attempted: graph.version(),
                });
            }
        }

        graphs.insert(graph.id(), graph.to_record());
        debug!(graph_id = %graph.id(), version = graph.version(), "Graph saved");
        Ok(())
    }

    async fn find_by_id(&self, graph_id: GraphId) -> GraphCommandResult<Option<Graph>> {
        let record = self.graphs.read().await.get(&graph_id).cloned();
        record.map(Self::rebuild).transpose()
    }

    async fn exists(&self, graph_id: GraphId) -> GraphCommandResult<bool> {
        Ok(self.graphs.read().await.contains_key(&graph_id))
    }

    async fn delete(&self, graph_id: GraphId) -> GraphCommandResult<bool> {
        Ok(self.graphs.write().await.remove(&graph_id).is_some())
    }

    async fn find_all(&self) -> GraphCommandResult<Vec<Graph>> {
        let mut records: Vec<GraphRecord> = self.graphs.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records.into_iter().map(Self::rebuild).collect()
    }
}

#[async_trait]
impl GraphLookup for InMemoryGraphRepository {
    async fn find_by_id(&self, graph_id: GraphId) -> Option<GraphSnapshot> {
        match GraphRepository::find_by_id(self, graph_id).await {
            Ok(graph) => graph.map(|graph| graph.snapshot()),
            Err(e) => {
                error!(graph_id = %graph_id, error = %e, "Failed to load graph for lookup");
                None
            }
        }
    }

    async fn contains_graph(&self, graph_id: GraphId) -> bool {
        self.graphs.read().await.contains_key(&graph_id)
    }
}
