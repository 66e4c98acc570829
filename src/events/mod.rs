//! Graph domain events
//!
//! The metrics pipeline listens for [`GraphSaved`], published after a graph
//! mutation has been committed to the repository.

use crate::aggregate::GraphSnapshot;
use crate::value_objects::GraphId;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A graph mutation was committed
#[derive(Debug, Clone)]
pub struct GraphSaved {
    /// The graph that changed
    pub graph_id: GraphId,
    /// The committed state, when the publisher has it at hand
    pub snapshot: Option<Arc<GraphSnapshot>>,
    /// When the mutation was committed
    pub saved_at: DateTime<Utc>,
}

impl GraphSaved {
    /// Event carrying the committed state, so consumers never read a stale graph
    pub fn with_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            graph_id: snapshot.graph_id,
            snapshot: Some(Arc::new(snapshot)),
            saved_at: Utc::now(),
        }
    }

    /// Event naming only the graph; consumers resolve the state themselves
    pub fn by_id(graph_id: GraphId) -> Self {
        Self {
            graph_id,
            snapshot: None,
            saved_at: Utc::now(),
        }
    }

    /// Aggregate version of the carried snapshot
    pub fn version(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|snapshot| snapshot.version)
    }
}
