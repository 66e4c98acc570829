//! Bounded background execution of metrics recomputation

use super::MetricsComputationService;
use crate::config::MetricsConfig;
use crate::events::GraphSaved;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Notified after a graph mutation has been committed
///
/// Implementations must return promptly and never fail back to the caller.
pub trait MutationTrigger: Send + Sync {
    fn graph_saved(&self, event: GraphSaved);
}

/// Fixed set of worker tasks draining a bounded queue of [`GraphSaved`] events
pub struct MetricsWorkerPool {
    sender: Mutex<Option<mpsc::Sender<GraphSaved>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl MetricsWorkerPool {
    /// Spawn the workers on the current tokio runtime
    pub fn start(service: Arc<MetricsComputationService>, config: &MetricsConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let workers = (0..worker_count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&service),
                ))
            })
            .collect();

        info!(
            worker_count,
            queue_capacity = config.queue_capacity,
            "Metrics worker pool started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            dropped: AtomicU64::new(0),
        }
    }

    /// Number of events rejected because the queue was full or closed
    pub fn dropped_jobs(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting events, then wait for queued and in-flight jobs
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Metrics worker terminated abnormally");
            }
        }
        info!(dropped = self.dropped_jobs(), "Metrics worker pool stopped");
    }

    fn reject(&self, event: &GraphSaved, reason: &str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(graph_id = %event.graph_id, reason, "Dropping metrics recomputation");
    }
}

impl MutationTrigger for MetricsWorkerPool {
    fn graph_saved(&self, event: GraphSaved) {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            self.reject(&event, "worker pool stopped");
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => self.reject(&event, "queue full"),
            Err(TrySendError::Closed(event)) => self.reject(&event, "queue closed"),
        }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<GraphSaved>>>,
    service: Arc<MetricsComputationService>,
) {
    loop {
        let event = receiver.lock().await.recv().await;
        let Some(event) = event else {
            break;
        };

        let graph_id = event.graph_id;
        let service = Arc::clone(&service);
        let job = tokio::spawn(async move { service.handle_graph_saved(event).await });
        if let Err(e) = job.await {
            error!(worker, graph_id = %graph_id, error = %e, "Metrics job aborted");
        }
    }
    debug!(worker, "Metrics worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Graph, GraphSnapshot};
    use crate::infrastructure::InMemoryMetricsStore;
    use crate::metrics::GraphLookup;
    use crate::value_objects::GraphId;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    /// Holds every lookup until the test opens the gate
    struct GatedLookup {
        snapshot: GraphSnapshot,
        entered: Notify,
        gate: Semaphore,
    }

    #[async_trait]
    impl GraphLookup for GatedLookup {
        async fn find_by_id(&self, graph_id: GraphId) -> Option<GraphSnapshot> {
            self.entered.notify_one();
            let _permit = self.gate.acquire().await.ok()?;
            (graph_id == self.snapshot.graph_id).then(|| self.snapshot.clone())
        }
    }

    fn path_graph() -> Graph {
        let mut graph = Graph::new(GraphId::new(), "path", "");
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(a, b, "edge").unwrap();
        graph
    }

    fn config(worker_count: usize, queue_capacity: usize) -> MetricsConfig {
        MetricsConfig {
            worker_count,
            queue_capacity,
            settle_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_events() {
        let graph = path_graph();
        let lookup = Arc::new(GatedLookup {
            snapshot: graph.snapshot(),
            entered: Notify::new(),
            gate: Semaphore::new(1),
        });
        let store = Arc::new(InMemoryMetricsStore::new());
        let service = Arc::new(
            MetricsComputationService::new(lookup, store.clone())
                .with_settle_delay(Duration::ZERO),
        );
        let pool = MetricsWorkerPool::start(service, &config(2, 50));

        pool.graph_saved(GraphSaved::with_snapshot(graph.snapshot()));
        pool.shutdown().await;

        let metrics = store.find_metrics(graph.id()).await.unwrap();
        assert_eq!(metrics.node_count, 2);
        assert_eq!(metrics.edge_count, 1);
        assert_eq!(pool.dropped_jobs(), 0);
        assert!(!pool.is_running());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let graph = path_graph();
        let lookup = Arc::new(GatedLookup {
            snapshot: graph.snapshot(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        });
        let store = Arc::new(InMemoryMetricsStore::new());
        let service = Arc::new(
            MetricsComputationService::new(lookup.clone(), store.clone())
                .with_settle_delay(Duration::ZERO),
        );
        let pool = MetricsWorkerPool::start(service, &config(1, 1));

        pool.graph_saved(GraphSaved::with_snapshot(graph.snapshot()));
        lookup.entered.notified().await;

        // The only worker is parked in the lookup: one slot queues, the next drops.
        pool.graph_saved(GraphSaved::with_snapshot(graph.snapshot()));
        pool.graph_saved(GraphSaved::with_snapshot(graph.snapshot()));
        assert_eq!(pool.dropped_jobs(), 1);

        lookup.gate.add_permits(1);
        pool.shutdown().await;

        assert!(store.find_metrics(graph.id()).await.is_some());
        assert_eq!(pool.dropped_jobs(), 1);
    }

    #[tokio::test]
    async fn test_events_after_shutdown_are_dropped() {
        let graph = path_graph();
        let lookup = Arc::new(GatedLookup {
            snapshot: graph.snapshot(),
            entered: Notify::new(),
            gate: Semaphore::new(1),
        });
        let store = Arc::new(InMemoryMetricsStore::new());
        let service = Arc::new(MetricsComputationService::new(lookup, store.clone()));
        let pool = MetricsWorkerPool::start(service, &config(2, 4));
        pool.shutdown().await;

        pool.graph_saved(GraphSaved::with_snapshot(graph.snapshot()));

        assert_eq!(pool.dropped_jobs(), 1);
        assert!(store.find_metrics(graph.id()).await.is_none());
    }
}
