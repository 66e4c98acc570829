//! Random graph demo
//!
//! Builds a random graph with preferential attachment through the command
//! handler, prints depth-first and breadth-first orders, waits for the metrics
//! pipeline and writes a GraphViz DOT rendering of the result.
//!
//! Usage: `random-graph-demo [seed]`

use anyhow::{Context as _, Result};
use cim_graph_analytics::{
    GraphCommand, GraphCommandHandler, GraphCommandHandlerImpl, GraphCommandOutcome, GraphId,
    GraphRepository, InMemoryGraphRepository, InMemoryMetricsStore, MetricsComputationService,
    MetricsConfig, MetricsWorkerPool, NodeId,
};
use petgraph::dot::Dot;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const NUM_NODES: usize = 10;
const NUM_EDGES: usize = 40;
const SELF_LOOP_RETRIES: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let mut rng = match std::env::args().nth(1) {
        Some(seed) => StdRng::seed_from_u64(
            seed.parse()
                .with_context(|| format!("seed must be an unsigned integer, got {seed:?}"))?,
        ),
        None => StdRng::from_entropy(),
    };

    let config = MetricsConfig::load(Some("graph-metrics"))?;
    let repository = Arc::new(InMemoryGraphRepository::new());
    let store = Arc::new(InMemoryMetricsStore::new());
    let service = Arc::new(MetricsComputationService::from_config(
        repository.clone(),
        store.clone(),
        &config,
    ));
    let pool = Arc::new(MetricsWorkerPool::start(service, &config));
    let handler = GraphCommandHandlerImpl::new(repository.clone(), pool.clone());

    println!("Creating random graph with preferential attachment...");
    println!("Nodes: {NUM_NODES}, Edges: {NUM_EDGES}");
    println!();

    let graph_id = build_random_graph(&handler, &mut rng).await?;
    let graph = repository.load(graph_id).await?;
    let node_ids = graph.structure().sorted_node_ids();
    let start = graph
        .structure()
        .contexts()
        .find(|context| context.label() == "1")
        .map(|context| context.node_id())
        .or_else(|| node_ids.first().copied())
        .context("graph has no nodes")?;

    println!("=== Depth-First Traversal ===");
    graph
        .structure()
        .depth_first_traversal(start, |context| println!("{}", context.label()))?;
    println!();

    println!("=== Breadth-First Traversal ===");
    graph
        .structure()
        .breadth_first_traversal(start, |context| println!("{}", context.label()))?;
    println!();

    pool.shutdown().await;

    let report = store
        .find_report(graph_id)
        .await
        .context("metrics were not computed")?;
    println!("=== Graph Metrics ===");
    println!("{}", serde_json::to_string_pretty(&report.metrics)?);
    println!();
    println!("=== Degree Distribution ===");
    for entry in &report.degree_distribution {
        println!("degree {:>2}: {} node(s)", entry.degree, entry.node_count);
    }
    if let Some(hub) = report.node_metrics.iter().max_by_key(|node| node.total_degree()) {
        let label = graph
            .structure()
            .get_context(hub.node_id)
            .map_or("?", |context| context.label().as_str());
        println!(
            "Hub: node {label} with degree {} (centrality {:.3})",
            hub.total_degree(),
            hub.degree_centrality
        );
    }

    let output_dir = Path::new("graph-output");
    fs::create_dir_all(output_dir)?;
    let (digraph, _) = graph.structure().to_petgraph();
    let dot_path = output_dir.join("random-graph.dot");
    fs::write(&dot_path, format!("{}", Dot::new(&digraph)))?;
    println!();
    println!("Generated DOT diagram: {}", dot_path.display());
    println!("To render it, run:");
    println!("  dot -Tpng {} -o random-graph.png", dot_path.display());

    Ok(())
}

/// Create the graph and add edges, favouring endpoints that already have many edges
async fn build_random_graph(
    handler: &GraphCommandHandlerImpl,
    rng: &mut StdRng,
) -> Result<GraphId> {
    let graph_id = handler
        .handle(GraphCommand::CreateGraph {
            name: "random".to_string(),
            description: "Preferential attachment demo".to_string(),
        })
        .await?
        .graph_id();

    let mut node_ids: Vec<NodeId> = Vec::with_capacity(NUM_NODES);
    for i in 0..NUM_NODES {
        let outcome = handler
            .handle(GraphCommand::AddNode {
                graph_id,
                label: (i + 1).to_string(),
            })
            .await?;
        if let GraphCommandOutcome::NodeAdded { node_id, .. } = outcome {
            node_ids.push(node_id);
        }
    }

    let mut degrees = vec![0usize; node_ids.len()];
    for edge in 0..NUM_EDGES {
        let from = select_preferential(&degrees, rng)?;
        let mut to = select_preferential(&degrees, rng)?;
        for _ in 0..SELF_LOOP_RETRIES {
            if to != from {
                break;
            }
            to = select_preferential(&degrees, rng)?;
        }

        handler
            .handle(GraphCommand::AddEdge {
                graph_id,
                source_id: node_ids[from],
                target_id: node_ids[to],
                label: Some((edge + 1).to_string()),
            })
            .await?;
        degrees[from] += 1;
        degrees[to] += 1;
    }

    info!(graph_id = %graph_id, nodes = node_ids.len(), "Random graph built");
    Ok(graph_id)
}

/// Each node is weighted by its degree plus one, so isolated nodes stay reachable
fn select_preferential(degrees: &[usize], rng: &mut StdRng) -> Result<usize> {
    let weights = WeightedIndex::new(degrees.iter().map(|degree| degree + 1))?;
    Ok(weights.sample(rng))
}
