//! Graph command handlers
//!
//! Command handlers validate graph commands, apply them to the aggregate, commit
//! the result through the repository and notify the metrics pipeline.

use crate::{
    aggregate::{Graph, DEFAULT_EDGE_LABEL},
    commands::{GraphCommand, GraphCommandError, GraphCommandOutcome, GraphCommandResult},
    events::GraphSaved,
    metrics::MutationTrigger,
    GraphId,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Trait for handling graph commands
#[async_trait]
pub trait GraphCommandHandler: Send + Sync {
    /// Apply one command and commit the result
    async fn handle(&self, command: GraphCommand) -> GraphCommandResult<GraphCommandOutcome>;
}

/// Repository trait for loading and saving graph aggregates
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Save a graph aggregate
    ///
    /// Implementations reject a graph whose version does not advance the stored one.
    async fn save(&self, graph: &Graph) -> GraphCommandResult<()>;

    /// Find a graph aggregate by ID
    async fn find_by_id(&self, graph_id: GraphId) -> GraphCommandResult<Option<Graph>>;

    /// Check if a graph exists
    async fn exists(&self, graph_id: GraphId) -> GraphCommandResult<bool>;

    /// Delete a graph, returning whether it existed
    async fn delete(&self, graph_id: GraphId) -> GraphCommandResult<bool>;

    async fn find_all(&self) -> GraphCommandResult<Vec<Graph>>;

    /// Load a graph aggregate that must exist
    async fn load(&self, graph_id: GraphId) -> GraphCommandResult<Graph> {
        self.find_by_id(graph_id)
            .await?
            .ok_or(GraphCommandError::GraphNotFound(graph_id))
    }
}

/// Graph command handler backed by a repository
pub struct GraphCommandHandlerImpl {
    repository: Arc<dyn GraphRepository>,
    trigger: Arc<dyn MutationTrigger>,
}

impl GraphCommandHandlerImpl {
    /// Create a new command handler
    pub fn new(repository: Arc<dyn GraphRepository>, trigger: Arc<dyn MutationTrigger>) -> Self {
        Self {
            repository,
            trigger,
        }
    }

    /// Save the graph, then hand the committed state to the metrics pipeline
    async fn commit(&self, graph: &Graph) -> GraphCommandResult<()> {
        self.repository.save(graph).await?;
        self.trigger
            .graph_saved(GraphSaved::with_snapshot(graph.snapshot()));
        Ok(())
    }
}

#[async_trait]
impl GraphCommandHandler for GraphCommandHandlerImpl {
    async fn handle(&self, command: GraphCommand) -> GraphCommandResult<GraphCommandOutcome> {
        match command {
            GraphCommand::CreateGraph { name, description } => {
                if name.trim().is_empty() {
                    return Err(GraphCommandError::InvalidCommand(
                        "Graph name cannot be empty".to_string(),
                    ));
                }

                let graph = Graph::new(GraphId::new(), name, description);
                self.commit(&graph).await?;

                info!(graph_id = %graph.id(), name = graph.name(), "Graph created");
                Ok(GraphCommandOutcome::GraphCreated {
                    graph_id: graph.id(),
                })
            }

            GraphCommand::AddNode { graph_id, label } => {
                let mut graph = self.repository.load(graph_id).await?;
                let node_id = graph.add_node(label);
                self.commit(&graph).await?;

                debug!(graph_id = %graph_id, node_id = %node_id, "Node added");
                Ok(GraphCommandOutcome::NodeAdded { graph_id, node_id })
            }

            GraphCommand::RemoveNode { graph_id, node_id } => {
                let mut graph = self.repository.load(graph_id).await?;
                if !graph.remove_node(node_id) {
                    return Ok(GraphCommandOutcome::Unchanged { graph_id });
                }
                self.commit(&graph).await?;

                debug!(graph_id = %graph_id, node_id = %node_id, "Node removed");
                Ok(GraphCommandOutcome::NodeRemoved { graph_id, node_id })
            }

            GraphCommand::AddEdge {
                graph_id,
                source_id,
                target_id,
                label,
            } => {
                let mut graph = self.repository.load(graph_id).await?;
                let label = label.unwrap_or_else(|| DEFAULT_EDGE_LABEL.to_string());
                graph.add_edge(source_id, target_id, label)?;
                self.commit(&graph).await?;

                debug!(
                    graph_id = %graph_id,
                    source = %source_id,
                    target = %target_id,
                    "Edge added"
                );
                Ok(GraphCommandOutcome::EdgeAdded {
                    graph_id,
                    source_id,
                    target_id,
                })
            }

            GraphCommand::RemoveEdge {
                graph_id,
                source_id,
                target_id,
            } => {
                let mut graph = self.repository.load(graph_id).await?;
                if !graph.remove_edge(source_id, target_id) {
                    return Ok(GraphCommandOutcome::Unchanged { graph_id });
                }
                self.commit(&graph).await?;

                debug!(
                    graph_id = %graph_id,
                    source = %source_id,
                    target = %target_id,
                    "Edge removed"
                );
                Ok(GraphCommandOutcome::EdgeRemoved {
                    graph_id,
                    source_id,
                    target_id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryGraphRepository;
    use crate::persistent::GraphError;
    use crate::NodeId;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTrigger {
        events: Mutex<Vec<GraphSaved>>,
    }

    impl MutationTrigger for RecordingTrigger {
        fn graph_saved(&self, event: GraphSaved) {
            self.events.lock().push(event);
        }
    }

    fn handler() -> (
        GraphCommandHandlerImpl,
        Arc<InMemoryGraphRepository>,
        Arc<RecordingTrigger>,
    ) {
        let repository = Arc::new(InMemoryGraphRepository::new());
        let trigger = Arc::new(RecordingTrigger::default());
        let handler = GraphCommandHandlerImpl::new(repository.clone(), trigger.clone());
        (handler, repository, trigger)
    }

    async fn create_graph(handler: &GraphCommandHandlerImpl) -> GraphId {
        let outcome = handler
            .handle(GraphCommand::CreateGraph {
                name: "Test Graph".to_string(),
                description: "A test graph".to_string(),
            })
            .await
            .unwrap();
        outcome.graph_id()
    }

    async fn add_node(handler: &GraphCommandHandlerImpl, graph_id: GraphId, label: &str) -> NodeId {
        match handler
            .handle(GraphCommand::AddNode {
                graph_id,
                label: label.to_string(),
            })
            .await
            .unwrap()
        {
            GraphCommandOutcome::NodeAdded { node_id, .. } => node_id,
            other => panic!("Expected NodeAdded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_graph_command() {
        let (handler, repository, trigger) = handler();

        let graph_id = create_graph(&handler).await;

        let graph = repository.load(graph_id).await.unwrap();
        assert_eq!(graph.name(), "Test Graph");
        assert_eq!(graph.description(), "A test graph");

        let events = trigger.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].graph_id, graph_id);
        assert_eq!(events[0].version(), Some(1));
    }

    #[tokio::test]
    async fn test_create_graph_validation() {
        let (handler, repository, trigger) = handler();

        let result = handler
            .handle(GraphCommand::CreateGraph {
                name: "  ".to_string(),
                description: "A test graph".to_string(),
            })
            .await;

        match result.unwrap_err() {
            GraphCommandError::InvalidCommand(msg) => {
                assert!(msg.contains("name cannot be empty"));
            }
            other => panic!("Expected InvalidCommand error, got {other:?}"),
        }
        assert!(repository.is_empty().await);
        assert!(trigger.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_add_node_and_edge_commands() {
        let (handler, repository, trigger) = handler();
        let graph_id = create_graph(&handler).await;
        let a = add_node(&handler, graph_id, "a").await;
        let b = add_node(&handler, graph_id, "b").await;

        let outcome = handler
            .handle(GraphCommand::AddEdge {
                graph_id,
                source_id: a,
                target_id: b,
                label: None,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            GraphCommandOutcome::EdgeAdded {
                graph_id,
                source_id: a,
                target_id: b
            }
        );

        let graph = repository.load(graph_id).await.unwrap();
        assert_eq!(
            graph.structure().edge_label(a, b).map(String::as_str),
            Some(DEFAULT_EDGE_LABEL)
        );

        let events = trigger.events.lock();
        assert_eq!(events.len(), 4);
        let latest = events[3].snapshot.as_ref().unwrap();
        assert_eq!(latest.graph.edge_count(), 1);
        assert_eq!(latest.version, graph.version());
    }

    #[tokio::test]
    async fn test_add_edge_to_missing_node_fails() {
        let (handler, _repository, trigger) = handler();
        let graph_id = create_graph(&handler).await;
        let a = add_node(&handler, graph_id, "a").await;

        let result = handler
            .handle(GraphCommand::AddEdge {
                graph_id,
                source_id: a,
                target_id: NodeId::from_uuid(uuid::Uuid::nil()),
                label: Some("depends_on".to_string()),
            })
            .await;

        assert!(matches!(
            result,
            Err(GraphCommandError::Graph(GraphError::InvalidArgument(_)))
        ));
        assert_eq!(trigger.events.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_commands_on_unknown_graph() {
        let (handler, _repository, _trigger) = handler();
        let graph_id = GraphId::new();

        let result = handler
            .handle(GraphCommand::AddNode {
                graph_id,
                label: "task".to_string(),
            })
            .await;

        assert_eq!(result, Err(GraphCommandError::GraphNotFound(graph_id)));
    }

    #[tokio::test]
    async fn test_removals_of_absent_elements_are_unchanged() {
        let (handler, repository, trigger) = handler();
        let graph_id = create_graph(&handler).await;
        let a = add_node(&handler, graph_id, "a").await;
        let b = add_node(&handler, graph_id, "b").await;
        let version = repository.load(graph_id).await.unwrap().version();

        let outcome = handler
            .handle(GraphCommand::RemoveEdge {
                graph_id,
                source_id: a,
                target_id: b,
            })
            .await
            .unwrap();
        assert_eq!(outcome, GraphCommandOutcome::Unchanged { graph_id });
        assert!(!outcome.is_mutation());

        let outcome = handler
            .handle(GraphCommand::RemoveNode {
                graph_id,
                node_id: NodeId::from_uuid(uuid::Uuid::nil()),
            })
            .await
            .unwrap();
        assert_eq!(outcome, GraphCommandOutcome::Unchanged { graph_id });

        assert_eq!(repository.load(graph_id).await.unwrap().version(), version);
        assert_eq!(trigger.events.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_remove_node_drops_incident_edges() {
        let (handler, repository, _trigger) = handler();
        let graph_id = create_graph(&handler).await;
        let a = add_node(&handler, graph_id, "a").await;
        let b = add_node(&handler, graph_id, "b").await;
        handler
            .handle(GraphCommand::AddEdge {
                graph_id,
                source_id: a,
                target_id: b,
                label: None,
            })
            .await
            .unwrap();

        let outcome = handler
            .handle(GraphCommand::RemoveNode { graph_id, node_id: b })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            GraphCommandOutcome::NodeRemoved {
                graph_id,
                node_id: b
            }
        );

        let graph = repository.load(graph_id).await.unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.structure().get_context(a).unwrap().out_degree(), 0);
    }
}
